use crate::config::Config;
use crate::errors::{ReportError, Result};
use crate::models::instrument::DailyBar;
use crate::scrapers::base::{MarketDataSource, RateLimiter, BROWSER_USER_AGENT};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

/// Yahoo Finance chart API v8 响应结构
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Yahoo Finance 行情抓取器
pub struct YahooScraper {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl YahooScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(ReportError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.market_data_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(config.min_request_interval),
        })
    }

    /// 交易日少于日历日，按 bars * 2 + 10 天的日历窗口请求
    fn request_window(bars: usize, now: DateTime<Utc>) -> Result<(i64, i64)> {
        let start = i64::try_from(bars)
            .ok()
            .and_then(|b| b.checked_mul(2))
            .and_then(|d| d.checked_add(10))
            .and_then(ChronoDuration::try_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| ReportError::ProviderError(format!("History window of {} bars is out of range", bars)))?;
        Ok((start.timestamp(), now.timestamp()))
    }
}

#[async_trait]
impl MarketDataSource for YahooScraper {
    fn source_name(&self) -> &'static str {
        "Yahoo Finance"
    }

    async fn fetch_history(&self, symbol: &str, bars: usize) -> Result<Vec<DailyBar>> {
        let (period1, period2) = Self::request_window(bars, Utc::now())?;
        self.limiter.wait().await;

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Fetching {} from {}", symbol, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("{} response: {} ({} bytes)", symbol, status, body.len());

        match parse_chart_response(&body, bars) {
            Ok(data) => Ok(data),
            Err(e) if status.is_success() => Err(e),
            Err(ReportError::ProviderError(msg)) => Err(ReportError::ProviderError(msg)),
            Err(_) => Err(ReportError::ProviderError(format!("HTTP status {} for {}", status, symbol))),
        }
    }
}

/// 解析 chart 响应，返回按日期升序、最多 `bars` 条的日线
pub fn parse_chart_response(body: &str, bars: usize) -> Result<Vec<DailyBar>> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        return Err(ReportError::ProviderError(format!("{} - {}", error.code, error.description)));
    }

    let result = match response.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = match result.indicators.quote.into_iter().next() {
        Some(quote) => quote,
        None => return Ok(Vec::new()),
    };

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut data: Vec<DailyBar> = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let open = opens.get(i).copied().flatten();
        let high = highs.get(i).copied().flatten();
        let low = lows.get(i).copied().flatten();
        let close = closes.get(i).copied().flatten();

        // 任一价格缺失则跳过该行
        let (open, high, low, close) = match (open, high, low, close) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => continue,
        };
        let date = match timestamp_to_date(*ts, offset) {
            Some(date) => date,
            None => continue,
        };

        let bar = DailyBar {
            date,
            open,
            high,
            low,
            close,
            volume: volumes.get(i).copied().flatten().unwrap_or(0),
        };

        // 盘中重复返回的最后一根K线以新值为准
        match data.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => data.push(bar),
        }
    }

    data.sort_by(|a, b| a.date.cmp(&b.date));
    data.dedup_by(|b, a| a.date == b.date);
    if data.len() > bars {
        data.drain(..data.len() - bars);
    }
    Ok(data)
}

fn timestamp_to_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}
