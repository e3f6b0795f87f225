use market_report::config::{parse_lookback_bars, Config};
use market_report::scrapers::constituents::NseConstituentsScraper;
use market_report::scrapers::news::NewsApiScraper;
use market_report::scrapers::yahoo::YahooScraper;
use market_report::services::report_service::ReportService;

use anyhow::Context;
use clap::{Arg, Command};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("market_report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Daily financial market report: indices, currencies, commodities, crypto, movers and news")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Config file (defaults to config.json, then config.example.json)")
                .takes_value(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for the PDF report and charts")
                .takes_value(true),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory for CSV/JSON/Arrow dumps")
                .takes_value(true),
        )
        .arg(
            Arg::new("lookback")
                .short('l')
                .long("lookback")
                .value_name("BARS")
                .help("Number of daily bars to fetch per instrument")
                .takes_value(true),
        )
        .get_matches();

    // 命令行参数覆盖配置文件
    let mut config = Config::load(matches.value_of("config").map(Path::new));
    if let Some(dir) = matches.value_of("output-dir") {
        config = config.with_output_dir(dir);
    }
    if let Some(dir) = matches.value_of("data-dir") {
        config = config.with_data_dir(dir);
    }
    if let Some(bars) = matches.value_of("lookback") {
        let bars = parse_lookback_bars(bars).context("invalid --lookback value")?;
        config = config.with_lookback_bars(bars);
    }

    info!(
        "Lookback {} bars, output {}, data {}",
        config.lookback_bars,
        config.output_dir.display(),
        config.data_dir.display()
    );

    if !config.has_news_key() {
        warn!("news_api_key is empty, the report will have no news section");
    }

    let market = Arc::new(YahooScraper::new(&config)?);
    let news = Arc::new(NewsApiScraper::new(&config)?);
    let constituents = Arc::new(NseConstituentsScraper::new(&config)?);

    let service = ReportService::new(config, market, news, constituents);
    let summary = service.run().await.context("report generation failed")?;

    info!(
        "{} instruments ({} unavailable), {} headlines, {} constituents, {} charts",
        summary.instruments,
        summary.failures,
        summary.headlines,
        summary.constituents,
        summary.charts.len()
    );
    println!("Report saved: {}", summary.pdf_path.display());

    Ok(())
}
