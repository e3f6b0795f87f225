#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use market_report::errors::{ReportError, Result};
use market_report::models::instrument::DailyBar;
use market_report::models::market::Constituent;
use market_report::models::news::Headline;
use market_report::scrapers::base::{ConstituentsSource, MarketDataSource, NewsSource};
use std::collections::HashMap;

/// 生成 `n` 根从 2025-01-01 开始的日线，收盘价为 `closes(i)`
pub fn bars<F: Fn(usize) -> f64>(n: usize, closes: F) -> Vec<DailyBar> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = closes(i);
            DailyBar {
                date: start + Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as u64,
            }
        })
        .collect()
}

/// 内存行情源，未登记的代码返回错误
#[derive(Default)]
pub struct StubMarket {
    pub series: HashMap<String, Vec<DailyBar>>,
}

impl StubMarket {
    pub fn with(mut self, symbol: &str, series: Vec<DailyBar>) -> Self {
        self.series.insert(symbol.to_string(), series);
        self
    }
}

#[async_trait]
impl MarketDataSource for StubMarket {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_history(&self, symbol: &str, bars: usize) -> Result<Vec<DailyBar>> {
        match self.series.get(symbol) {
            Some(series) => {
                let start = series.len().saturating_sub(bars);
                Ok(series[start..].to_vec())
            }
            None => Err(ReportError::ProviderError(format!("No data found for {}", symbol))),
        }
    }
}

pub struct StubNews(pub Vec<Headline>);

#[async_trait]
impl NewsSource for StubNews {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_headlines(&self) -> Result<Vec<Headline>> {
        Ok(self.0.clone())
    }
}

pub fn headline(title: &str) -> Headline {
    Headline {
        title: title.to_string(),
        source: "Mint".to_string(),
        url: "https://example.com/a".to_string(),
        published_at: None,
    }
}

/// `None` 表示下载失败
pub struct StubConstituents(pub Option<Vec<Constituent>>);

#[async_trait]
impl ConstituentsSource for StubConstituents {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>> {
        self.0
            .clone()
            .ok_or_else(|| ReportError::ProviderError("Constituents download failed: HTTP status 403".to_string()))
    }
}

pub fn constituent(symbol: &str, sector: &str) -> Constituent {
    Constituent {
        symbol: symbol.to_string(),
        provider_symbol: format!("{}.NS", symbol),
        company: format!("{} Ltd.", symbol),
        sector: Some(sector.to_string()),
    }
}
