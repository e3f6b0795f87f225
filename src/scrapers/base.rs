use crate::errors::Result;
use crate::models::instrument::DailyBar;
use crate::models::market::Constituent;
use crate::models::news::Headline;
use async_trait::async_trait;
use log::debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Base trait for market data providers
#[async_trait]
pub trait MarketDataSource {
    /// Provider name used in logs
    fn source_name(&self) -> &'static str;

    /// Fetch up to `bars` daily bars for a symbol, oldest first
    async fn fetch_history(&self, symbol: &str, bars: usize) -> Result<Vec<DailyBar>>;
}

/// 新闻数据源
#[async_trait]
pub trait NewsSource {
    fn source_name(&self) -> &'static str;

    /// Headlines in the provider's order
    async fn fetch_headlines(&self) -> Result<Vec<Headline>>;
}

/// 指数成分股数据源
#[async_trait]
pub trait ConstituentsSource {
    fn source_name(&self) -> &'static str;

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>>;
}

/// 请求频率限制：两次请求之间至少间隔 `min_interval`
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let now = Instant::now();
        let should_wait = {
            let mut last = self.last_request.lock().unwrap_or_else(|p| p.into_inner());
            let should_wait = match *last {
                Some(instant) => {
                    let remaining = self.min_interval.saturating_sub(instant.elapsed());
                    (!remaining.is_zero()).then_some(remaining)
                }
                None => None,
            };
            *last = Some(now + should_wait.unwrap_or_default());
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("Waiting {:?} to respect rate limit", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}
