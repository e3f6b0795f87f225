use crate::models::instrument::{FetchFailure, Instrument, MarketData, WatchItem};
use crate::models::news::Headline;
use crate::scrapers::base::{MarketDataSource, NewsSource};
use log::{debug, error, info, warn};

/// 依次抓取观察列表中的每个品种。单个品种失败只记录日志，不影响其余品种。
pub async fn fetch_instruments(
    source: &(dyn MarketDataSource + Send + Sync),
    watchlist: &[WatchItem],
    bars: usize,
) -> MarketData {
    info!("Fetching {} instruments from {}", watchlist.len(), source.source_name());

    let mut data = MarketData::default();
    for item in watchlist {
        match source.fetch_history(&item.symbol, bars).await {
            Ok(series) if !series.is_empty() => {
                debug!("{} ({}): {} bars", item.name, item.symbol, series.len());
                data.instruments.push(Instrument::from_watch_item(item, series));
            }
            Ok(_) => {
                warn!("No data returned for {} ({})", item.name, item.symbol);
                data.failures.push(FetchFailure {
                    symbol: item.symbol.clone(),
                    name: item.name.clone(),
                    reason: "no data returned".to_string(),
                });
            }
            Err(e) => {
                error!("Error fetching {} ({}): {}", item.name, item.symbol, e);
                data.failures.push(FetchFailure {
                    symbol: item.symbol.clone(),
                    name: item.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Fetched {} instruments, {} unavailable",
        data.instruments.len(),
        data.failures.len()
    );
    data
}

/// 新闻抓取失败时返回空列表
pub async fn collect_headlines(source: &(dyn NewsSource + Send + Sync)) -> Vec<Headline> {
    match source.fetch_headlines().await {
        Ok(headlines) => {
            info!("Fetched {} headlines from {}", headlines.len(), source.source_name());
            headlines
        }
        Err(e) => {
            error!("Error fetching news from {}: {}", source.source_name(), e);
            Vec::new()
        }
    }
}
