mod common;

use common::{bars, constituent, headline, StubConstituents, StubMarket, StubNews};
use market_report::config::Config;
use market_report::models::instrument::{Category, Region, WatchItem};
use market_report::report::{CHARTS, MARKET_OVERVIEW, NEWS, SECTOR_PERFORMANCE, TECHNICAL_OVERVIEW, TOP_GAINERS, TOP_LOSERS};
use market_report::services::report_service::{ReportService, HISTORY_FILE};
use market_report::util::arrow_utils;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config(root: &Path) -> Config {
    Config::new()
        .with_output_dir(root.join("output"))
        .with_data_dir(root.join("data"))
        .with_watchlist(vec![
            WatchItem::new("NIFTY 50", "^NSEI", Category::Index, Region::India),
            WatchItem::new("S&P 500", "^GSPC", Category::Index, Region::Global),
            WatchItem::new("Gold", "GC=F", Category::Commodity, Region::Global),
        ])
        .with_technical_symbols(&["^GSPC"])
}

fn gspc_close(i: usize) -> f64 {
    4_000.0 + i as f64 * 5.0 + (i % 3) as f64
}

fn market() -> StubMarket {
    StubMarket::default()
        .with("^GSPC", bars(30, gspc_close))
        .with("^NSEI", bars(40, |i| 22_000.0 + i as f64 * 10.0))
        .with("TCS.NS", bars(2, |i| 100.0 + i as f64 * 5.0))
        .with("INFY.NS", bars(2, |i| 100.0 - i as f64 * 2.0))
        .with("HDFCBANK.NS", bars(2, |i| 100.0 + i as f64))
}

fn universe() -> StubConstituents {
    StubConstituents(Some(vec![
        constituent("TCS", "IT"),
        constituent("INFY", "IT"),
        constituent("HDFCBANK", "Financial Services"),
    ]))
}

#[tokio::test]
async fn full_run_writes_report_charts_and_dumps() {
    let dir = TempDir::new().unwrap();
    let service = ReportService::new(
        config(dir.path()),
        Arc::new(market()),
        Arc::new(StubNews(vec![headline("Markets close higher"), headline("RBI holds rates")])),
        Arc::new(universe()),
    );

    let summary = service.run().await.unwrap();

    assert_eq!(summary.instruments, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.headlines, 2);
    assert_eq!(summary.constituents, 3);
    assert_eq!(
        summary.sections,
        vec![MARKET_OVERVIEW, TOP_GAINERS, TOP_LOSERS, SECTOR_PERFORMANCE, TECHNICAL_OVERVIEW, CHARTS, NEWS]
    );

    let pdf = std::fs::read(&summary.pdf_path).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    let file_name = summary.pdf_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("Daily_Financial_Market_Report-"));
    assert!(file_name.ends_with(".pdf"));

    let charts = dir.path().join("output").join("charts");
    for name in ["^GSPC.png", "^GSPC_candle.png", "^GSPC_macd.png", "top_gainers.png", "sector_performance.png"] {
        assert!(charts.join(name).exists(), "missing chart {}", name);
    }

    let data = dir.path().join("data");
    for name in [
        "summary_indices.json",
        "indian_indices.csv",
        "global_indices.csv",
        "nifty50_universe.csv",
        "top_gainers.csv",
        "top_losers.csv",
        "sector_performance.csv",
        "indicators.json",
        "news_india_business.json",
        HISTORY_FILE,
    ] {
        assert!(data.join(name).exists(), "missing dump {}", name);
    }
    // 没有数据的分类不生成空表
    assert!(!data.join("crypto.csv").exists());
}

#[tokio::test]
async fn sma_matches_mean_of_last_twenty_closes() {
    let dir = TempDir::new().unwrap();
    let service = ReportService::new(
        config(dir.path()),
        Arc::new(market()),
        Arc::new(StubNews(Vec::new())),
        Arc::new(StubConstituents(None)),
    );
    service.run().await.unwrap();

    let text = std::fs::read_to_string(dir.path().join("data").join("indicators.json")).unwrap();
    let reports: Value = serde_json::from_str(&text).unwrap();
    let gspc = reports
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["symbol"] == "^GSPC")
        .unwrap();

    assert_eq!(gspc["values"]["sma_20"]["kind"], "value");
    let sma = gspc["values"]["sma_20"]["value"].as_f64().unwrap();
    let expected = (10..30).map(gspc_close).sum::<f64>() / 20.0;
    assert!((sma - expected).abs() < 1e-9, "{} != {}", sma, expected);

    // 30 根足够计算 MACD(12,26,9)
    assert_eq!(gspc["values"]["macd"]["kind"], "macd");

    assert!(dir.path().join("output").join("charts").join("^GSPC.png").exists());
}

#[tokio::test]
async fn constituents_failure_drops_breadth_sections_only() {
    let dir = TempDir::new().unwrap();
    let service = ReportService::new(
        config(dir.path()),
        Arc::new(market()),
        Arc::new(StubNews(vec![headline("Markets close higher")])),
        Arc::new(StubConstituents(None)),
    );

    let summary = service.run().await.unwrap();

    assert!(summary.pdf_path.exists());
    assert_eq!(summary.constituents, 0);
    assert!(!summary.sections.iter().any(|s| s == SECTOR_PERFORMANCE));
    assert!(!summary.sections.iter().any(|s| s == TOP_GAINERS));
    assert_eq!(summary.sections, vec![MARKET_OVERVIEW, TECHNICAL_OVERVIEW, CHARTS, NEWS]);
    assert!(!dir.path().join("data").join("sector_performance.csv").exists());
    assert!(!dir.path().join("output").join("charts").join("sector_performance.png").exists());
}

#[tokio::test]
async fn history_dump_reads_back() {
    let dir = TempDir::new().unwrap();
    let service = ReportService::new(
        config(dir.path()).with_lookback_bars(25),
        Arc::new(market()),
        Arc::new(StubNews(Vec::new())),
        Arc::new(StubConstituents(None)),
    );
    service.run().await.unwrap();

    let instruments = arrow_utils::read_instruments_from_arrow(&dir.path().join("data").join(HISTORY_FILE)).unwrap();
    assert_eq!(instruments.len(), 2);

    let gspc = instruments.iter().find(|i| i.symbol == "^GSPC").unwrap();
    assert_eq!(gspc.series.len(), 25);
    assert_eq!(gspc.series.last().unwrap().close, gspc_close(29));
    assert_eq!(gspc.region, Region::Global);
}

#[tokio::test]
async fn run_with_no_data_still_produces_pdf() {
    let dir = TempDir::new().unwrap();
    let service = ReportService::new(
        config(dir.path()),
        Arc::new(StubMarket::default()),
        Arc::new(StubNews(Vec::new())),
        Arc::new(StubConstituents(None)),
    );

    let summary = service.run().await.unwrap();
    assert_eq!(summary.instruments, 0);
    assert_eq!(summary.failures, 3);
    assert_eq!(summary.sections, vec![MARKET_OVERVIEW]);
    assert!(summary.charts.is_empty());
    assert!(summary.pdf_path.exists());
    // 没有新闻时不写新闻文件
    assert!(!dir.path().join("data").join("news_india_business.json").exists());
    assert!(!summary.dumps.iter().any(|p| p.ends_with("news_india_business.json")));
}
