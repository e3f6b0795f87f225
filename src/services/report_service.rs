use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::charts::{ChartRenderer, CANDLE_BARS};
use crate::config::Config;
use crate::errors::Result;
use crate::indicators::{compute_indicators, IndicatorReport};
use crate::models::instrument::{Category, Instrument, MarketData};
use crate::models::market::{MarketBreadth, Mover, Snapshot};
use crate::models::news::Headline;
use crate::report::pdf::render_pdf;
use crate::report::{ChartRef, ReportBuilder, OVERVIEW_GROUPS};
use crate::scrapers::base::{ConstituentsSource, MarketDataSource, NewsSource};
use crate::services::{breadth, market};
use crate::util::{self, arrow_utils};

pub const HISTORY_FILE: &str = "history.arrow";
const NEWS_DUMP: &str = "news_india_business";

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pdf_path: PathBuf,
    /// PDF 中实际出现的章节
    pub sections: Vec<String>,
    pub charts: Vec<PathBuf>,
    pub dumps: Vec<PathBuf>,
    pub instruments: usize,
    pub failures: usize,
    pub headlines: usize,
    pub constituents: usize,
}

/// 报告流水线：抓取、计算、落盘、绘图、生成 PDF
pub struct ReportService {
    config: Config,
    market: Arc<dyn MarketDataSource + Send + Sync>,
    news: Arc<dyn NewsSource + Send + Sync>,
    constituents: Arc<dyn ConstituentsSource + Send + Sync>,
    report_date: Option<NaiveDate>,
}

impl ReportService {
    pub fn new(
        config: Config,
        market: Arc<dyn MarketDataSource + Send + Sync>,
        news: Arc<dyn NewsSource + Send + Sync>,
        constituents: Arc<dyn ConstituentsSource + Send + Sync>,
    ) -> Self {
        Self {
            config,
            market,
            news,
            constituents,
            report_date: None,
        }
    }

    /// 固定报告日期（默认取配置时区的当天）
    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    fn report_date(&self) -> NaiveDate {
        self.report_date
            .unwrap_or_else(|| Utc::now().with_timezone(&self.config.timezone).date_naive())
    }

    /// Runs every stage once, in order.
    ///
    /// Only directory creation and PDF composition errors are returned. Fetch,
    /// dump and chart failures are logged and leave their part of the report empty.
    pub async fn run(&self) -> Result<RunSummary> {
        let charts_dir = self.config.charts_dir();
        util::ensure_dirs(&[
            self.config.data_dir.as_path(),
            self.config.output_dir.as_path(),
            charts_dir.as_path(),
        ])?;

        info!("Stage 1/6: market data");
        let market_data = market::fetch_instruments(
            self.market.as_ref(),
            &self.config.watchlist,
            self.config.lookback_bars,
        )
        .await;

        info!("Stage 2/6: news");
        let headlines = market::collect_headlines(self.news.as_ref()).await;

        info!("Stage 3/6: market breadth");
        let breadth = breadth::market_breadth(
            self.constituents.as_ref(),
            self.market.as_ref(),
            self.config.top_movers,
        )
        .await;

        info!("Stage 4/6: indicators");
        let indicators: Vec<IndicatorReport> = market_data.instruments.iter().map(compute_indicators).collect();

        info!("Stage 5/6: dumps and charts");
        let dumps = self.write_dumps(&market_data, &breadth, &indicators, &headlines);
        let charts = self.render_charts(&market_data, &breadth, &charts_dir);

        info!("Stage 6/6: report");
        let report = ReportBuilder {
            date: self.report_date(),
            market: &market_data,
            breadth: &breadth,
            indicators: &indicators,
            technical_symbols: &self.config.technical_symbols,
            charts: &charts,
            headlines: &headlines,
        }
        .build();

        let pdf_path = self.config.output_dir.join(report.file_name());
        render_pdf(&report, &pdf_path)?;
        info!("Report saved -> {}", pdf_path.display());

        Ok(RunSummary {
            pdf_path,
            sections: report.section_titles().into_iter().map(String::from).collect(),
            charts: charts.into_iter().map(|c| c.path).collect(),
            dumps,
            instruments: market_data.instruments.len(),
            failures: market_data.failures.len(),
            headlines: headlines.len(),
            constituents: breadth.constituents.len(),
        })
    }

    fn write_dumps(
        &self,
        market_data: &MarketData,
        breadth: &MarketBreadth,
        indicators: &[IndicatorReport],
        headlines: &[Headline],
    ) -> Vec<PathBuf> {
        let dir = self.config.data_dir.as_path();
        let mut written = Vec::new();

        let indices = snapshots(market_data, |i| i.category == Category::Index);
        keep(&mut written, "summary_indices.json", util::save_json(&indices, dir, "summary_indices"));

        for group in OVERVIEW_GROUPS.iter() {
            let rows = snapshots(market_data, |i| group.contains(i));
            keep_opt(&mut written, group.dump_name, util::save_csv(&rows, dir, group.dump_name));
        }

        keep_opt(&mut written, "nifty50_universe", util::save_csv(&breadth.constituents, dir, "nifty50_universe"));
        keep_opt(&mut written, "top_gainers", util::save_csv(&breadth.gainers, dir, "top_gainers"));
        keep_opt(&mut written, "top_losers", util::save_csv(&breadth.losers, dir, "top_losers"));
        keep_opt(&mut written, "sector_performance", util::save_csv(&breadth.sectors, dir, "sector_performance"));

        keep(&mut written, "indicators.json", util::save_json(indicators, dir, "indicators"));
        if headlines.is_empty() {
            warn!("No headlines, skipping {}.json", NEWS_DUMP);
        } else {
            keep(&mut written, "news", util::save_json(headlines, dir, NEWS_DUMP));
        }

        let history = dir.join(HISTORY_FILE);
        match arrow_utils::save_instruments_to_arrow(&market_data.instruments, &history) {
            Ok(()) => written.push(history),
            Err(e) => error!("Failed to write {}: {}", history.display(), e),
        }

        written
    }

    fn render_charts(&self, market_data: &MarketData, breadth: &MarketBreadth, dir: &Path) -> Vec<ChartRef> {
        let renderer = ChartRenderer::new(dir);
        let mut charts = Vec::new();

        for symbol in &self.config.technical_symbols {
            let instrument = match market_data.get(symbol) {
                Some(instrument) => instrument,
                None => {
                    warn!("No data for chart symbol {}", symbol);
                    continue;
                }
            };
            let name = &instrument.name;
            push_chart(&mut charts, format!("{} - Close & SMA(20)", name), renderer.line_chart(instrument));
            push_chart(
                &mut charts,
                format!("{} - Candlestick (last {} sessions)", name, CANDLE_BARS),
                renderer.candlestick_chart(instrument, CANDLE_BARS),
            );
            push_chart(&mut charts, format!("{} - MACD(12,26,9)", name), renderer.macd_chart(instrument));
        }

        for (file, title, movers) in [
            ("top_gainers", "Top Gainers", &breadth.gainers),
            ("top_losers", "Top Losers", &breadth.losers),
        ] {
            let values: Vec<f64> = movers.iter().map(|m| m.change_pct).collect();
            push_chart(&mut charts, bar_caption(title, movers), renderer.bar_chart(file, &values));
        }

        let values: Vec<f64> = breadth.sectors.iter().map(|s| s.change_pct).collect();
        let order: Vec<&str> = breadth.sectors.iter().map(|s| s.sector.as_str()).collect();
        push_chart(
            &mut charts,
            format!("Sector Performance (avg %): {}", order.join(", ")),
            renderer.bar_chart("sector_performance", &values),
        );

        info!("Rendered {} charts", charts.len());
        charts
    }
}

fn snapshots<F: Fn(&Instrument) -> bool>(market_data: &MarketData, filter: F) -> Vec<Snapshot> {
    market_data
        .instruments
        .iter()
        .filter(|i| filter(i))
        .filter_map(Snapshot::from_instrument)
        .collect()
}

fn bar_caption(title: &str, movers: &[Mover]) -> String {
    let order: Vec<&str> = movers.iter().map(|m| m.symbol.as_str()).collect();
    format!("{} (%): {}", title, order.join(", "))
}

fn push_chart(charts: &mut Vec<ChartRef>, title: String, result: Result<Option<PathBuf>>) {
    match result {
        Ok(Some(path)) => charts.push(ChartRef { title, path }),
        Ok(None) => {}
        Err(e) => error!("Chart '{}' failed: {}", title, e),
    }
}

fn keep(written: &mut Vec<PathBuf>, name: &str, result: Result<PathBuf>) {
    match result {
        Ok(path) => written.push(path),
        Err(e) => error!("Failed to write {}: {}", name, e),
    }
}

fn keep_opt(written: &mut Vec<PathBuf>, name: &str, result: Result<Option<PathBuf>>) {
    match result {
        Ok(path) => written.extend(path),
        Err(e) => error!("Failed to write {}: {}", name, e),
    }
}
