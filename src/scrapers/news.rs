use crate::config::Config;
use crate::errors::{ReportError, Result};
use crate::models::news::Headline;
use crate::scrapers::base::{NewsSource, RateLimiter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    title: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

/// NewsAPI top-headlines 抓取器
pub struct NewsApiScraper {
    client: Client,
    base_url: String,
    api_key: String,
    country: String,
    category: String,
    page_size: u32,
    limiter: RateLimiter,
}

impl NewsApiScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReportError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.news_api_url.trim_end_matches('/').to_string(),
            api_key: config.news_api_key.clone(),
            country: config.news_country.clone(),
            category: config.news_category.clone(),
            page_size: config.news_page_size,
            limiter: RateLimiter::new(config.min_request_interval),
        })
    }
}

#[async_trait]
impl NewsSource for NewsApiScraper {
    fn source_name(&self) -> &'static str {
        "NewsAPI"
    }

    async fn fetch_headlines(&self) -> Result<Vec<Headline>> {
        if self.api_key.is_empty() {
            warn!("news_api_key is not configured, skipping headlines");
            return Ok(Vec::new());
        }

        self.limiter.wait().await;
        info!("Fetching {} {} headlines", self.country, self.category);
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(format!("{}/v2/top-headlines", self.base_url))
            .query(&[
                ("country", self.country.as_str()),
                ("category", self.category.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("NewsAPI response: {} ({} bytes)", status, body.len());

        match parse_headlines(&body) {
            Ok(headlines) if status.is_success() => Ok(headlines),
            Ok(_) => Err(ReportError::ProviderError(format!("NewsAPI HTTP status {}", status))),
            Err(e) => Err(e),
        }
    }
}

/// 解析 NewsAPI 响应，保持接口返回的顺序
pub fn parse_headlines(body: &str) -> Result<Vec<Headline>> {
    let response: NewsApiResponse = serde_json::from_str(body)?;

    if response.status != "ok" {
        return Err(ReportError::ProviderError(format!(
            "NewsAPI {}: {}",
            response.code.unwrap_or_else(|| "error".to_string()),
            response.message.unwrap_or_default()
        )));
    }

    Ok(response
        .articles
        .into_iter()
        .map(|a| Headline {
            title: a.title.unwrap_or_default(),
            source: a.source.and_then(|s| s.name).unwrap_or_default(),
            url: a.url.unwrap_or_default(),
            published_at: a
                .published_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
        .collect())
}
