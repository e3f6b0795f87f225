use crate::config::Config;
use crate::errors::{ReportError, Result};
use crate::models::market::Constituent;
use crate::scrapers::base::{ConstituentsSource, BROWSER_USER_AGENT};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;

/// Yahoo 上 NSE 股票的后缀
const NSE_SUFFIX: &str = ".NS";

/// NSE 指数成分股列表（CSV）抓取器
pub struct NseConstituentsScraper {
    client: Client,
    url: String,
}

impl NseConstituentsScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(ReportError::RequestError)?;

        Ok(Self {
            client,
            url: config.constituents_url.clone(),
        })
    }
}

#[async_trait]
impl ConstituentsSource for NseConstituentsScraper {
    fn source_name(&self) -> &'static str {
        "NSE"
    }

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>> {
        info!("Downloading constituents list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Referer", "https://www.nseindia.com/")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReportError::ProviderError(format!(
                "Constituents download failed: HTTP status {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        debug!("Constituents response: {} bytes", text.len());
        parse_constituents_csv(&text)
    }
}

/// 解析成分股 CSV。行业列可以是 `Sector` 或 `Industry`。
pub fn parse_constituents_csv(text: &str) -> Result<Vec<Constituent>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let symbol_idx = column("Symbol")
        .ok_or_else(|| ReportError::DataError("Constituents CSV has no Symbol column".to_string()))?;
    let company_idx = column("Company Name");
    let sector_idx = column("Sector").or_else(|| column("Industry"));

    let mut constituents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let symbol = match record.get(symbol_idx) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => continue,
        };
        let company = company_idx
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .to_string();
        let sector = sector_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        constituents.push(Constituent {
            provider_symbol: format!("{}{}", symbol, NSE_SUFFIX),
            symbol,
            company,
            sector,
        });
    }

    info!("Parsed {} constituents", constituents.len());
    Ok(constituents)
}
