mod common;

use common::{bars, constituent, StubConstituents, StubMarket};
use market_report::config::Config;
use market_report::errors::ReportError;
use market_report::models::instrument::{Category, Region, WatchItem};
use market_report::report::{CHARTS, MARKET_OVERVIEW, NEWS, SECTOR_PERFORMANCE, TECHNICAL_OVERVIEW, TOP_GAINERS, TOP_LOSERS};
use market_report::scrapers::base::{ConstituentsSource, MarketDataSource, NewsSource};
use market_report::scrapers::constituents::NseConstituentsScraper;
use market_report::scrapers::news::NewsApiScraper;
use market_report::scrapers::yahoo::YahooScraper;
use market_report::services::market::{collect_headlines, fetch_instruments};
use market_report::services::report_service::ReportService;
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(url: &str) -> Config {
    Config::new()
        .with_min_request_interval(Duration::from_millis(0))
        .with_market_data_url(url)
        .with_news_api_url(url)
        .with_constituents_url(&format!("{}/content/indices/ind_nifty50list.csv", url))
}

// 2025-03-03 .. 2025-03-05 03:45 UTC（IST 09:15）
const CHART_BODY: &str = r#"{
    "chart": {
        "result": [{
            "meta": {"symbol": "^GSPC", "gmtoffset": 19800},
            "timestamp": [1740973500, 1741059900, 1741146300],
            "indicators": {"quote": [{
                "open":   [5900.0, 5850.5, null],
                "high":   [5950.0, 5870.0, 5800.0],
                "low":    [5880.0, 5790.0, 5700.0],
                "close":  [5940.0, 5800.0, 5750.0],
                "volume": [1000, null, 3000]
            }]}
        }],
        "error": null
    }
}"#;

#[tokio::test]
async fn yahoo_scraper_parses_daily_bars() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/v8/finance/chart/".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("interval".into(), "1d".into()),
            Matcher::UrlEncoded("events".into(), "history".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CHART_BODY)
        .create_async()
        .await;

    let scraper = YahooScraper::new(&test_config(&server.url())).unwrap();
    let series = scraper.fetch_history("^GSPC", 90).await.unwrap();

    mock.assert_async().await;
    // 开盘价缺失的一行被丢弃
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].date.to_string(), "2025-03-03");
    assert_eq!(series[1].close, 5800.0);
    assert_eq!(series[1].volume, 0);
}

#[tokio::test]
async fn yahoo_scraper_reports_unknown_symbol() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/v8/finance/chart/".to_string()))
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#)
        .create_async()
        .await;

    let scraper = YahooScraper::new(&test_config(&server.url())).unwrap();
    let err = scraper.fetch_history("NOPE", 90).await.unwrap_err();
    assert!(matches!(err, ReportError::ProviderError(ref msg) if msg.contains("Not Found")));
}

#[tokio::test]
async fn oversized_lookback_fails_per_symbol() {
    let server = mockito::Server::new_async().await;
    let scraper = YahooScraper::new(&test_config(&server.url())).unwrap();
    let watchlist = vec![
        WatchItem::new("S&P 500", "^GSPC", Category::Index, Region::Global),
        WatchItem::new("Gold", "GC=F", Category::Commodity, Region::Global),
    ];

    let data = fetch_instruments(&scraper, &watchlist, 1_000_000_000).await;

    assert!(data.instruments.is_empty());
    assert_eq!(data.failures.len(), 2);
    assert!(data.failures[0].reason.contains("out of range"));
}

#[tokio::test]
async fn invalid_news_key_yields_no_headlines() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/top-headlines")
        .match_query(Matcher::UrlEncoded("apiKey".into(), "bad-key".into()))
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid or incorrect."}"#)
        .expect(2)
        .create_async()
        .await;

    let scraper = NewsApiScraper::new(&test_config(&server.url()).with_news_api_key("bad-key")).unwrap();
    let err = scraper.fetch_headlines().await.unwrap_err();
    assert!(err.to_string().contains("apiKeyInvalid"));

    assert!(collect_headlines(&scraper).await.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn news_scraper_returns_headlines() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/top-headlines")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("country".into(), "in".into()),
            Matcher::UrlEncoded("category".into(), "business".into()),
            Matcher::UrlEncoded("pageSize".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"status":"ok","totalResults":2,"articles":[
                {"source":{"id":null,"name":"Mint"},"title":"Sensex ends higher","url":"https://a","publishedAt":"2025-03-04T10:00:00Z"},
                {"source":{"id":null,"name":"ET"},"title":"Rupee steady","url":"https://b","publishedAt":null}
            ]}"#,
        )
        .create_async()
        .await;

    let scraper = NewsApiScraper::new(&test_config(&server.url()).with_news_api_key("good-key")).unwrap();
    let headlines = scraper.fetch_headlines().await.unwrap();
    assert_eq!(headlines.len(), 2);
    assert_eq!(headlines[0].source, "Mint");
    assert!(headlines[0].published_at.is_some());
    assert_eq!(headlines[1].title, "Rupee steady");
}

#[tokio::test]
async fn constituents_scraper_downloads_csv() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/content/indices/ind_nifty50list.csv")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             Tata Consultancy Services Ltd.,Information Technology,TCS,EQ,INE467B01029\n\
             HDFC Bank Ltd.,Financial Services,HDFCBANK,EQ,INE040A01034\n",
        )
        .create_async()
        .await;

    let scraper = NseConstituentsScraper::new(&test_config(&server.url())).unwrap();
    let list = scraper.fetch_constituents().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].provider_symbol, "TCS.NS");
    assert_eq!(list[1].sector.as_deref(), Some("Financial Services"));
}

#[tokio::test]
async fn constituents_scraper_rejects_http_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/content/indices/ind_nifty50list.csv")
        .with_status(403)
        .create_async()
        .await;

    let scraper = NseConstituentsScraper::new(&test_config(&server.url())).unwrap();
    assert!(matches!(
        scraper.fetch_constituents().await,
        Err(ReportError::ProviderError(_))
    ));
}

#[tokio::test]
async fn report_without_news_keeps_other_sections() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/top-headlines")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid or incorrect."}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.url())
        .with_news_api_key("bad-key")
        .with_output_dir(dir.path().join("output"))
        .with_data_dir(dir.path().join("data"))
        .with_watchlist(vec![
            WatchItem::new("NIFTY 50", "^NSEI", Category::Index, Region::India),
            WatchItem::new("S&P 500", "^GSPC", Category::Index, Region::Global),
        ])
        .with_technical_symbols(&["^NSEI", "^GSPC"]);

    let market = StubMarket::default()
        .with("^NSEI", bars(60, |i| 22_000.0 + i as f64))
        .with("^GSPC", bars(60, |i| 5_000.0 - i as f64))
        .with("TCS.NS", bars(2, |i| 100.0 + i as f64))
        .with("SBIN.NS", bars(2, |i| 100.0 - i as f64));
    let universe = StubConstituents(Some(vec![constituent("TCS", "IT"), constituent("SBIN", "Financial Services")]));
    let news = NewsApiScraper::new(&config).unwrap();

    let summary = ReportService::new(config, Arc::new(market), Arc::new(news), Arc::new(universe))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.headlines, 0);
    assert!(summary.pdf_path.exists());
    assert_eq!(
        summary.sections,
        vec![MARKET_OVERVIEW, TOP_GAINERS, TOP_LOSERS, SECTOR_PERFORMANCE, TECHNICAL_OVERVIEW, CHARTS]
    );
    assert!(!summary.sections.iter().any(|s| s == NEWS));
}
