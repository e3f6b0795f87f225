//! 报告内容组装
//!
//! `ReportBuilder` 只负责按固定顺序组织章节与表格，PDF 排版见 [`pdf`]。

pub mod pdf;

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::indicators::{
    ema_key, resistance_key, sma_key, support_key, trend_key, IndicatorReport, IndicatorValue, CHANGE_KEY,
    EMA_FAST_SPAN, EMA_SLOW_SPAN, MACD_KEY, SMA_PERIOD, SUPPORT_RESISTANCE_WINDOW, TREND_WINDOW,
};
use crate::models::instrument::{Category, Instrument, MarketData, Region};
use crate::models::market::{MarketBreadth, Mover, Snapshot};
use crate::models::news::Headline;

pub const REPORT_TITLE: &str = "Daily Financial Market Report";

pub const MARKET_OVERVIEW: &str = "Market Overview";
pub const TOP_GAINERS: &str = "Top Gainers";
pub const TOP_LOSERS: &str = "Top Losers";
pub const SECTOR_PERFORMANCE: &str = "Sector Performance";
pub const TECHNICAL_OVERVIEW: &str = "Technical Overview";
pub const CHARTS: &str = "Charts";
pub const NEWS: &str = "Top Business News";

const MISSING: &str = "-";
const INSUFFICIENT: &str = "Insufficient data";

/// 报告中的内容块
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    /// 列宽为相对比例
    Table {
        widths: Vec<f32>,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Image {
        path: PathBuf,
        caption: String,
    },
    Bullets(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub subtitle: String,
    pub date: NaiveDate,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}.pdf", self.title.replace(' ', "_"), self.date.format("%Y-%m-%d"))
    }
}

/// 渲染好的图表文件
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRef {
    pub title: String,
    pub path: PathBuf,
}

/// 组装报告所需的全部数据
pub struct ReportBuilder<'a> {
    pub date: NaiveDate,
    pub market: &'a MarketData,
    pub breadth: &'a MarketBreadth,
    pub indicators: &'a [IndicatorReport],
    pub technical_symbols: &'a [String],
    pub charts: &'a [ChartRef],
    pub headlines: &'a [Headline],
}

/// 行情概览中的一组品种
pub struct OverviewGroup {
    pub heading: &'static str,
    pub first_column: &'static str,
    /// 对应的 CSV 文件名
    pub dump_name: &'static str,
    pub category: Category,
    pub region: Option<Region>,
}

impl OverviewGroup {
    pub fn contains(&self, instrument: &Instrument) -> bool {
        instrument.category == self.category && self.region.map_or(true, |r| instrument.region == r)
    }
}

pub const OVERVIEW_GROUPS: [OverviewGroup; 5] = [
    OverviewGroup {
        heading: "Indian Indices",
        first_column: "Index",
        dump_name: "indian_indices",
        category: Category::Index,
        region: Some(Region::India),
    },
    OverviewGroup {
        heading: "Global Indices",
        first_column: "Index",
        dump_name: "global_indices",
        category: Category::Index,
        region: Some(Region::Global),
    },
    OverviewGroup {
        heading: "Currencies",
        first_column: "Pair",
        dump_name: "currencies",
        category: Category::Currency,
        region: None,
    },
    OverviewGroup {
        heading: "Commodities",
        first_column: "Commodity",
        dump_name: "commodities",
        category: Category::Commodity,
        region: None,
    },
    OverviewGroup {
        heading: "Crypto",
        first_column: "Crypto",
        dump_name: "crypto",
        category: Category::Crypto,
        region: None,
    },
];

fn fmt_price(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v)
    } else {
        MISSING.to_string()
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.2}%", v),
        _ => MISSING.to_string(),
    }
}

fn snapshot_table(first_col: &str, instruments: &[&Instrument]) -> Option<Block> {
    let rows: Vec<Vec<String>> = instruments
        .iter()
        .filter_map(|i| Snapshot::from_instrument(i))
        .map(|s| {
            vec![
                s.name,
                fmt_price(s.open),
                fmt_price(s.close),
                fmt_pct(s.change_pct),
                fmt_price(s.ltp),
            ]
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(Block::Table {
        widths: vec![2.0, 1.0, 1.0, 1.0, 1.0],
        header: [first_col, "Open", "Close", "Change %", "LTP"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    })
}

fn market_overview(market: &MarketData) -> Section {
    let mut section = Section::new(MARKET_OVERVIEW);

    for group in OVERVIEW_GROUPS.iter() {
        let members: Vec<&Instrument> = market.instruments.iter().filter(|i| group.contains(i)).collect();
        if let Some(table) = snapshot_table(group.first_column, &members) {
            section.blocks.push(Block::Heading(group.heading.to_string()));
            section.blocks.push(table);
        }
    }

    if market.instruments.is_empty() {
        section.blocks.push(Block::Paragraph("No market data available.".to_string()));
    }

    if !market.failures.is_empty() {
        let names: Vec<String> = market
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.name, f.symbol))
            .collect();
        section
            .blocks
            .push(Block::Paragraph(format!("Unavailable: {}", names.join(", "))));
    }

    section
}

fn movers_section(title: &str, movers: &[Mover]) -> Option<Section> {
    if movers.is_empty() {
        return None;
    }
    let mut section = Section::new(title);
    section.blocks.push(Block::Table {
        widths: vec![2.0, 1.0, 1.0],
        header: vec!["Symbol".to_string(), "Change %".to_string(), "Close".to_string()],
        rows: movers
            .iter()
            .map(|m| vec![m.symbol.clone(), fmt_pct(Some(m.change_pct)), fmt_price(m.close)])
            .collect(),
    });
    Some(section)
}

fn sector_section(breadth: &MarketBreadth) -> Option<Section> {
    if breadth.sectors.is_empty() {
        return None;
    }
    let mut section = Section::new(SECTOR_PERFORMANCE);
    section.blocks.push(Block::Table {
        widths: vec![3.0, 1.5, 1.0],
        header: vec!["Sector".to_string(), "Avg Change %".to_string(), "Stocks".to_string()],
        rows: breadth
            .sectors
            .iter()
            .map(|s| vec![s.sector.clone(), fmt_pct(Some(s.change_pct)), s.constituents.to_string()])
            .collect(),
    });
    Some(section)
}

fn value_text(value: Option<&IndicatorValue>) -> String {
    match value {
        Some(IndicatorValue::Value { value }) => fmt_price(*value),
        Some(IndicatorValue::InsufficientData { .. }) => INSUFFICIENT.to_string(),
        Some(IndicatorValue::Undefined { .. }) | None => MISSING.to_string(),
        Some(IndicatorValue::Macd { macd, .. }) => fmt_price(*macd),
        Some(IndicatorValue::Trend { direction, slope }) => format!("{} (slope {:.4})", direction, slope),
    }
}

/// 指标表格行：(名称, 数值)
pub fn technical_rows(report: &IndicatorReport) -> Vec<Vec<String>> {
    let row = |label: &str, value: String| vec![label.to_string(), value];
    let mut rows = vec![
        row("SMA(20)", value_text(report.get(&sma_key(SMA_PERIOD)))),
        row("1D Change", match report.get(CHANGE_KEY) {
            Some(IndicatorValue::Value { value }) => fmt_pct(Some(*value)),
            other => value_text(other),
        }),
        row("Support (20d min)", value_text(report.get(&support_key(SUPPORT_RESISTANCE_WINDOW)))),
        row("Resistance (20d max)", value_text(report.get(&resistance_key(SUPPORT_RESISTANCE_WINDOW)))),
        row("Trendline Direction", value_text(report.get(&trend_key(TREND_WINDOW)))),
        row(
            "EMA(9) vs EMA(15)",
            format!(
                "{} vs {}",
                value_text(report.get(&ema_key(EMA_FAST_SPAN))),
                value_text(report.get(&ema_key(EMA_SLOW_SPAN)))
            ),
        ),
    ];

    match report.get(MACD_KEY) {
        Some(IndicatorValue::Macd { macd, signal, histogram }) => {
            rows.push(row("MACD (last)", fmt_price(*macd)));
            rows.push(row("Signal (last)", fmt_price(*signal)));
            rows.push(row("Histogram (last)", fmt_price(*histogram)));
            let view = if macd > signal { "Bullish" } else { "Bearish" };
            rows.push(row("Interpretation", view.to_string()));
        }
        other => rows.push(row("MACD (last)", value_text(other))),
    }

    rows
}

fn technical_section(indicators: &[IndicatorReport], symbols: &[String]) -> Option<Section> {
    let mut section = Section::new(TECHNICAL_OVERVIEW);
    for symbol in symbols {
        if let Some(report) = indicators.iter().find(|r| &r.symbol == symbol) {
            section.blocks.push(Block::Heading(report.name.clone()));
            section.blocks.push(Block::Table {
                widths: vec![1.0, 1.0],
                header: vec!["Metric".to_string(), "Value".to_string()],
                rows: technical_rows(report),
            });
        }
    }
    if section.blocks.is_empty() {
        None
    } else {
        Some(section)
    }
}

fn charts_section(charts: &[ChartRef]) -> Option<Section> {
    if charts.is_empty() {
        return None;
    }
    let mut section = Section::new(CHARTS);
    for chart in charts {
        section.blocks.push(Block::Image {
            path: chart.path.clone(),
            caption: chart.title.clone(),
        });
    }
    Some(section)
}

fn news_section(headlines: &[Headline]) -> Option<Section> {
    if headlines.is_empty() {
        return None;
    }
    let mut section = Section::new(NEWS);
    section.blocks.push(Block::Bullets(
        headlines
            .iter()
            .map(|h| (h.title.clone(), h.source.clone()))
            .collect(),
    ));
    Some(section)
}

impl ReportBuilder<'_> {
    /// Assembles the report in fixed order: overview, movers, sectors, technicals, charts, news.
    ///
    /// Sections with no data are left out.
    pub fn build(&self) -> Report {
        let mut sections = vec![market_overview(self.market)];
        sections.extend(movers_section(TOP_GAINERS, &self.breadth.gainers));
        sections.extend(movers_section(TOP_LOSERS, &self.breadth.losers));
        sections.extend(sector_section(self.breadth));
        sections.extend(technical_section(self.indicators, self.technical_symbols));
        sections.extend(charts_section(self.charts));
        sections.extend(news_section(self.headlines));

        Report {
            title: REPORT_TITLE.to_string(),
            subtitle: self.date.format("%A, %d %B %Y").to_string(),
            date: self.date,
            sections,
        }
    }
}
