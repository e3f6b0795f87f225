use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 品种类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Index,
    Currency,
    Commodity,
    Crypto,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Index => "index",
            Category::Currency => "currency",
            Category::Commodity => "commodity",
            Category::Crypto => "crypto",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "index" => Ok(Category::Index),
            "currency" => Ok(Category::Currency),
            "commodity" => Ok(Category::Commodity),
            "crypto" => Ok(Category::Crypto),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

/// 市场区域，用于区分国内与全球指数表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    India,
    #[default]
    Global,
}

/// 观察列表中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchItem {
    pub name: String,
    pub symbol: String,
    pub category: Category,
    #[serde(default)]
    pub region: Region,
}

impl WatchItem {
    pub fn new(name: &str, symbol: &str, category: Category, region: Region) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            category,
            region,
        }
    }
}

/// 日线数据结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Instrument with its daily series, oldest bar first.
#[derive(Debug, Clone, Serialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub category: Category,
    pub region: Region,
    pub series: Vec<DailyBar>,
}

impl Instrument {
    pub fn from_watch_item(item: &WatchItem, series: Vec<DailyBar>) -> Self {
        Self {
            symbol: item.symbol.clone(),
            name: item.name.clone(),
            category: item.category,
            region: item.region,
            series,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.series.iter().map(|b| b.close).collect()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.series.last().map(|b| b.date)
    }
}

/// 单个品种抓取失败的标记
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub name: String,
    pub reason: String,
}

/// 一次运行抓取到的全部行情
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub instruments: Vec<Instrument>,
    pub failures: Vec<FetchFailure>,
}

impl MarketData {
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }
}

/// 默认观察列表
pub fn default_watchlist() -> Vec<WatchItem> {
    use Category::*;
    use Region::*;

    vec![
        WatchItem::new("NIFTY 50", "^NSEI", Index, India),
        WatchItem::new("NIFTY BANK", "^NSEBANK", Index, India),
        WatchItem::new("SENSEX", "^BSESN", Index, India),
        WatchItem::new("S&P 500", "^GSPC", Index, Global),
        WatchItem::new("DOW JONES", "^DJI", Index, Global),
        WatchItem::new("NASDAQ", "^IXIC", Index, Global),
        WatchItem::new("FTSE 100", "^FTSE", Index, Global),
        WatchItem::new("DAX", "^GDAXI", Index, Global),
        WatchItem::new("NIKKEI 225", "^N225", Index, Global),
        WatchItem::new("HANG SENG", "^HSI", Index, Global),
        WatchItem::new("SHANGHAI COMP", "000001.SS", Index, Global),
        WatchItem::new("USD/INR", "USDINR=X", Currency, India),
        WatchItem::new("EUR/INR", "EURINR=X", Currency, India),
        WatchItem::new("GBP/INR", "GBPINR=X", Currency, India),
        WatchItem::new("JPY/INR", "JPYINR=X", Currency, India),
        WatchItem::new("Gold", "GC=F", Commodity, Global),
        WatchItem::new("Silver", "SI=F", Commodity, Global),
        WatchItem::new("Crude Oil", "CL=F", Commodity, Global),
        WatchItem::new("Natural Gas", "NG=F", Commodity, Global),
        WatchItem::new("Bitcoin", "BTC-USD", Crypto, Global),
        WatchItem::new("Ethereum", "ETH-USD", Crypto, Global),
    ]
}
