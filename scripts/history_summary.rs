use market_report::services::report_service::HISTORY_FILE;
use market_report::util::arrow_utils;
use std::env;
use std::error::Error;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    // 默认读取 data/history.arrow，可通过第一个参数指定路径
    let arrow_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data").join(HISTORY_FILE));
    if !arrow_path.exists() {
        return Err(format!("数据文件不存在: {}，请先运行 'cargo run --bin market_report'", arrow_path.display()).into());
    }

    let instruments = arrow_utils::read_instruments_from_arrow(&arrow_path)?;
    println!("{:<12} {:<16} {:<10} {:>6}  {}", "Symbol", "Name", "Category", "Bars", "Latest");
    println!("{:-<60}", "");

    let mut latest_overall = None;
    for instrument in &instruments {
        let latest = instrument.latest_date();
        if latest > latest_overall {
            latest_overall = latest;
        }
        println!(
            "{:<12} {:<16} {:<10} {:>6}  {}",
            instrument.symbol,
            instrument.name,
            instrument.category.to_string(),
            instrument.series.len(),
            latest.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }

    match latest_overall {
        Some(date) => println!("最新交易日期: {}", date),
        None => println!("未找到有效的日期"),
    }

    Ok(())
}
