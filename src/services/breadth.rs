use crate::indicators::pct_change;
use crate::models::market::{Constituent, MarketBreadth, Mover, SectorAggregate};
use crate::scrapers::base::{ConstituentsSource, MarketDataSource};
use log::{debug, error, info, warn};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 计算涨跌幅所需的K线数量
const QUOTE_BARS: usize = 2;

/// 成分股的最新收盘与涨跌幅
#[derive(Debug, Clone)]
struct ConstituentQuote {
    symbol: String,
    sector: Option<String>,
    close: f64,
    /// 前收为 0 时无定义
    change_pct: Option<f64>,
}

/// Movers and per-sector averages for an index universe.
///
/// Any failure to obtain the constituents list yields `MarketBreadth::default()`;
/// this function never returns an error.
pub async fn market_breadth(
    constituents: &(dyn ConstituentsSource + Send + Sync),
    market: &(dyn MarketDataSource + Send + Sync),
    top_n: usize,
) -> MarketBreadth {
    let universe = match constituents.fetch_constituents().await {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => {
            warn!("{} returned an empty constituents list", constituents.source_name());
            return MarketBreadth::default();
        }
        Err(e) => {
            error!("Error fetching constituents from {}: {}", constituents.source_name(), e);
            return MarketBreadth::default();
        }
    };

    info!("Fetching quotes for {} constituents", universe.len());
    let mut quotes = Vec::with_capacity(universe.len());
    for constituent in &universe {
        if let Some(quote) = fetch_quote(market, constituent).await {
            quotes.push(quote);
        }
    }

    let (gainers, losers) = top_movers(&quotes, top_n);
    let sectors = sector_performance(&quotes);

    MarketBreadth {
        constituents: universe,
        gainers,
        losers,
        sectors,
    }
}

async fn fetch_quote(
    market: &(dyn MarketDataSource + Send + Sync),
    constituent: &Constituent,
) -> Option<ConstituentQuote> {
    let series = match market.fetch_history(&constituent.provider_symbol, QUOTE_BARS).await {
        Ok(series) => series,
        Err(e) => {
            warn!("Error fetching {}: {}", constituent.provider_symbol, e);
            return None;
        }
    };

    let last = series.last()?;
    let prev = if series.len() > 1 { &series[series.len() - 2] } else { last };
    let change_pct = pct_change(last.close, prev.close);
    debug!(
        "{}: {:.2} ({})",
        constituent.symbol,
        last.close,
        change_pct.map_or_else(|| "n/a".to_string(), |c| format!("{:+.2}%", c))
    );

    Some(ConstituentQuote {
        symbol: constituent.symbol.clone(),
        sector: constituent.sector.clone(),
        close: last.close,
        change_pct,
    })
}

impl ConstituentQuote {
    /// 排序用涨跌幅，无定义时按 0 处理
    fn mover_change(&self) -> f64 {
        self.change_pct.unwrap_or(0.0)
    }
}

fn by_change(a: &ConstituentQuote, b: &ConstituentQuote) -> Ordering {
    a.mover_change().partial_cmp(&b.mover_change()).unwrap_or(Ordering::Equal)
}

fn to_mover(q: &ConstituentQuote) -> Mover {
    Mover {
        symbol: q.symbol.clone(),
        close: q.close,
        change_pct: q.mover_change(),
    }
}

/// 涨幅前 n（降序）与跌幅前 n（升序）
fn top_movers(quotes: &[ConstituentQuote], n: usize) -> (Vec<Mover>, Vec<Mover>) {
    let mut sorted: Vec<&ConstituentQuote> = quotes.iter().collect();
    sorted.sort_by(|a, b| by_change(b, a));
    let gainers = sorted.iter().take(n).map(|q| to_mover(q)).collect();

    sorted.sort_by(|a, b| by_change(a, b));
    let losers = sorted.iter().take(n).map(|q| to_mover(q)).collect();

    (gainers, losers)
}

/// 按行业名称排序的平均涨跌幅，没有行业信息或涨跌幅无定义的成分股不参与
fn sector_performance(quotes: &[ConstituentQuote]) -> Vec<SectorAggregate> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for quote in quotes {
        if let (Some(sector), Some(change)) = (quote.sector.as_deref(), quote.change_pct) {
            groups.entry(sector).or_default().push(change);
        }
    }

    groups
        .into_iter()
        .map(|(sector, changes)| SectorAggregate {
            sector: sector.to_string(),
            change_pct: changes.iter().sum::<f64>() / changes.len() as f64,
            constituents: changes.len(),
        })
        .collect()
}
