use serde::Serialize;

use crate::indicators::pct_change;
use crate::models::instrument::Instrument;

/// 行情快照：最新开盘、收盘、涨跌幅
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Change%")]
    pub change_pct: Option<f64>,
    #[serde(rename = "LTP")]
    pub ltp: f64,
}

impl Snapshot {
    /// Builds a snapshot from the last two bars. A single bar is compared with itself.
    pub fn from_instrument(instrument: &Instrument) -> Option<Self> {
        let last = instrument.series.last()?;
        let prev = if instrument.series.len() > 1 {
            &instrument.series[instrument.series.len() - 2]
        } else {
            last
        };

        Some(Self {
            name: instrument.name.clone(),
            symbol: instrument.symbol.clone(),
            open: last.open,
            close: last.close,
            change_pct: pct_change(last.close, prev.close),
            ltp: last.close,
        })
    }
}

/// 指数成分股
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constituent {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "YahooSymbol")]
    pub provider_symbol: String,
    #[serde(rename = "Company Name")]
    pub company: String,
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
}

/// 涨跌幅榜条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Change%")]
    pub change_pct: f64,
}

/// 行业平均表现
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorAggregate {
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Change%")]
    pub change_pct: f64,
    #[serde(rename = "Count")]
    pub constituents: usize,
}

/// Movers and sector table. Empty when the constituents list could not be fetched.
#[derive(Debug, Clone, Default)]
pub struct MarketBreadth {
    pub constituents: Vec<Constituent>,
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
    pub sectors: Vec<SectorAggregate>,
}

impl MarketBreadth {
    pub fn is_empty(&self) -> bool {
        self.gainers.is_empty() && self.losers.is_empty() && self.sectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instrument::{Category, DailyBar, Region};
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
        }
    }

    fn instrument(series: Vec<DailyBar>) -> Instrument {
        Instrument {
            symbol: "^NSEI".to_string(),
            name: "NIFTY 50".to_string(),
            category: Category::Index,
            region: Region::India,
            series,
        }
    }

    #[test]
    fn snapshot_uses_last_two_bars() {
        let snap = Snapshot::from_instrument(&instrument(vec![bar(3, 100.0), bar(4, 110.0)])).unwrap();
        assert_eq!(snap.close, 110.0);
        assert_eq!(snap.open, 109.0);
        assert_eq!(snap.ltp, 110.0);
        assert!((snap.change_pct.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_single_bar_has_zero_change() {
        let snap = Snapshot::from_instrument(&instrument(vec![bar(3, 100.0)])).unwrap();
        assert_eq!(snap.change_pct, Some(0.0));
    }

    #[test]
    fn snapshot_of_empty_series_is_none() {
        assert!(Snapshot::from_instrument(&instrument(Vec::new())).is_none());
    }
}
