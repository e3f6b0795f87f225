use chrono_tz::Tz;
use log::{error, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ReportError;
use crate::models::instrument::{default_watchlist, WatchItem};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const EXAMPLE_CONFIG_FILE: &str = "config.example.json";

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const NEWS_API_BASE_URL: &str = "https://newsapi.org";
pub const NIFTY50_CONSTITUENTS_URL: &str = "https://archives.nseindia.com/content/indices/ind_nifty50list.csv";

/// 解析命令行中的回看K线数，至少为 1
pub fn parse_lookback_bars(value: &str) -> crate::errors::Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ReportError::DataError("lookback must be at least 1 bar".to_string())),
        Ok(bars) => Ok(bars),
        Err(e) => Err(ReportError::DataError(format!("invalid lookback '{}': {}", value, e))),
    }
}

/// 配置文件中可识别的键，全部可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub news_api_key: Option<String>,
    pub news_country: Option<String>,
    pub news_category: Option<String>,
    pub news_page_size: Option<u32>,
    pub timezone: Option<String>,
    pub lookback_bars: Option<usize>,
    pub top_movers: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub min_request_interval_ms: Option<u64>,
    pub market_data_url: Option<String>,
    pub news_api_url: Option<String>,
    pub constituents_url: Option<String>,
    pub output_dir: Option<String>,
    pub data_dir: Option<String>,
    pub technical_symbols: Option<Vec<String>>,
    pub watchlist: Option<Vec<WatchItem>>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub news_api_key: String,
    pub news_country: String,
    pub news_category: String,
    pub news_page_size: u32,
    pub timezone: Tz,
    pub lookback_bars: usize,
    pub top_movers: usize,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
    pub market_data_url: String,
    pub news_api_url: String,
    pub constituents_url: String,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub technical_symbols: Vec<String>,
    pub watchlist: Vec<WatchItem>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            news_api_key: String::new(),
            news_country: "in".to_string(),
            news_category: "business".to_string(),
            news_page_size: 10,
            timezone: chrono_tz::Asia::Kolkata,
            lookback_bars: 90,
            top_movers: 5,
            request_timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(500),
            market_data_url: YAHOO_BASE_URL.to_string(),
            news_api_url: NEWS_API_BASE_URL.to_string(),
            constituents_url: NIFTY50_CONSTITUENTS_URL.to_string(),
            output_dir: PathBuf::from("output"),
            data_dir: PathBuf::from("data"),
            technical_symbols: vec!["^NSEI".to_string(), "^NSEBANK".to_string(), "^GSPC".to_string()],
            watchlist: default_watchlist(),
        }
    }

    /// 按顺序读取 config.json / config.example.json，均不存在时使用默认值
    pub fn load(explicit: Option<&Path>) -> Self {
        let candidates = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => vec![PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(EXAMPLE_CONFIG_FILE)],
        };
        Self::load_from_candidates(&candidates)
    }

    pub fn load_from_candidates(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            return match Self::read_file_config(path) {
                Ok(file_config) => {
                    info!("Loaded configuration from {}", path.display());
                    Self::new().merge(file_config)
                }
                Err(e) => {
                    error!("Failed to load config {}: {}", path.display(), e);
                    Self::new()
                }
            };
        }

        warn!("No config file found, using defaults");
        Self::new()
    }

    fn read_file_config(path: &Path) -> crate::errors::Result<FileConfig> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 用配置文件中出现的键覆盖默认值
    pub fn merge(mut self, file: FileConfig) -> Self {
        if let Some(key) = file.news_api_key {
            self.news_api_key = key.trim().to_string();
        }
        if let Some(country) = file.news_country {
            self.news_country = country;
        }
        if let Some(category) = file.news_category {
            self.news_category = category;
        }
        if let Some(size) = file.news_page_size {
            self.news_page_size = size;
        }
        if let Some(tz) = file.timezone {
            match tz.parse::<Tz>() {
                Ok(tz) => self.timezone = tz,
                Err(e) => warn!("Invalid timezone '{}' ({}), keeping {}", tz, e, self.timezone),
            }
        }
        match file.lookback_bars {
            Some(0) => warn!("lookback_bars must be at least 1, keeping {}", self.lookback_bars),
            Some(bars) => self.lookback_bars = bars,
            None => {}
        }
        if let Some(n) = file.top_movers {
            self.top_movers = n;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = file.min_request_interval_ms {
            self.min_request_interval = Duration::from_millis(ms);
        }
        if let Some(url) = file.market_data_url {
            self.market_data_url = url;
        }
        if let Some(url) = file.news_api_url {
            self.news_api_url = url;
        }
        if let Some(url) = file.constituents_url {
            self.constituents_url = url;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(symbols) = file.technical_symbols {
            self.technical_symbols = symbols;
        }
        if let Some(list) = file.watchlist {
            self.watchlist = list;
        }
        self
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.output_dir.join("charts")
    }

    pub fn has_news_key(&self) -> bool {
        !self.news_api_key.is_empty()
    }

    pub fn with_news_api_key(mut self, key: &str) -> Self {
        self.news_api_key = key.to_string();
        self
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_lookback_bars(mut self, bars: usize) -> Self {
        self.lookback_bars = bars;
        self
    }

    pub fn with_watchlist(mut self, watchlist: Vec<WatchItem>) -> Self {
        self.watchlist = watchlist;
        self
    }

    pub fn with_technical_symbols(mut self, symbols: &[&str]) -> Self {
        self.technical_symbols = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_market_data_url(mut self, url: &str) -> Self {
        self.market_data_url = url.to_string();
        self
    }

    pub fn with_news_api_url(mut self, url: &str) -> Self {
        self.news_api_url = url.to_string();
        self
    }

    pub fn with_constituents_url(mut self, url: &str) -> Self {
        self.constituents_url = url.to_string();
        self
    }
}
