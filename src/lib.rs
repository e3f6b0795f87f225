// 公开导出的模块，供外部使用
pub mod charts;
pub mod errors;
pub mod indicators;
pub mod models;
pub mod report;

// 主程序使用的模块
pub mod config;
pub mod scrapers;
pub mod services;
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{ReportError, Result};
pub use indicators::{compute_indicators, IndicatorReport, IndicatorValue};
pub use models::instrument::{DailyBar, Instrument, MarketData};
pub use services::report_service::{ReportService, RunSummary};
