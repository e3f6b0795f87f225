use log::{info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// 确保输出目录存在
pub fn ensure_dirs(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created directory {}", dir.display());
        }
    }
    Ok(())
}

/// Writes rows to `<dir>/<name>.csv`. Empty input is skipped and returns `Ok(None)`.
pub fn save_csv<T: Serialize>(rows: &[T], dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        warn!("Tried to save empty table: {}.csv (skipped)", name);
        return Ok(None);
    }

    let path = dir.join(format!("{}.csv", name));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Saved CSV -> {}", path.display());
    Ok(Some(path))
}

/// 以缩进格式写入 `<dir>/<name>.json`
pub fn save_json<T: Serialize + ?Sized>(value: &T, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", name));
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, value)?;

    info!("Saved JSON -> {}", path.display());
    Ok(path)
}

// Arrow数据转换工具
pub mod arrow_utils {
    use super::*;
    use crate::errors::ReportError;
    use crate::models::instrument::{Category, DailyBar, Instrument, Region};
    use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
    use arrow_array::{
        Array, ArrayRef, Date32Array, Float64Array, ListArray, RecordBatch, StringArray, StructArray, UInt64Array,
    };
    use arrow_ipc::reader::FileReader;
    use arrow_ipc::writer::FileWriter;
    use arrow_schema::{DataType, Field, Fields, Schema};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn arrow_err<E: std::fmt::Display>(e: E) -> ReportError {
        ReportError::ArrowError(e.to_string())
    }

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
    }

    fn date_to_days(date: NaiveDate) -> i32 {
        (date - epoch()).num_days() as i32
    }

    fn days_to_date(days: i32) -> NaiveDate {
        epoch() + chrono::Duration::days(days as i64)
    }

    fn daily_fields() -> Fields {
        Fields::from(vec![
            Field::new("date", DataType::Date32, false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::UInt64, false),
        ])
    }

    fn region_str(region: Region) -> &'static str {
        match region {
            Region::India => "india",
            Region::Global => "global",
        }
    }

    // 将品种数据转换为Arrow记录批次
    pub fn instruments_to_record_batch(data: &[Instrument]) -> Result<RecordBatch> {
        let fields = daily_fields();

        let mut dates = Vec::new();
        let mut opens = Vec::new();
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        let mut offsets: Vec<i32> = vec![0];
        let mut validity = Vec::new();

        for instrument in data {
            for bar in &instrument.series {
                dates.push(date_to_days(bar.date));
                opens.push(bar.open);
                highs.push(bar.high);
                lows.push(bar.low);
                closes.push(bar.close);
                volumes.push(bar.volume);
            }
            let last = offsets.last().copied().unwrap_or(0);
            offsets.push(last + instrument.series.len() as i32);
            validity.push(true);
        }

        let struct_array = StructArray::try_new(
            fields.clone(),
            vec![
                Arc::new(Date32Array::from(dates)) as ArrayRef,
                Arc::new(Float64Array::from(opens)),
                Arc::new(Float64Array::from(highs)),
                Arc::new(Float64Array::from(lows)),
                Arc::new(Float64Array::from(closes)),
                Arc::new(UInt64Array::from(volumes)),
            ],
            None,
        )
        .map_err(arrow_err)?;

        let item_field = Arc::new(Field::new("item", DataType::Struct(fields.clone()), false));
        let list_array = ListArray::try_new(
            item_field.clone(),
            OffsetBuffer::new(ScalarBuffer::from(offsets)),
            Arc::new(struct_array),
            Some(NullBuffer::from(validity)),
        )
        .map_err(arrow_err)?;

        let schema = Schema::new(vec![
            Field::new("symbol", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("region", DataType::Utf8, false),
            Field::new("daily", DataType::List(item_field), true),
        ]);

        let symbols: StringArray = data.iter().map(|i| Some(i.symbol.as_str())).collect();
        let names: StringArray = data.iter().map(|i| Some(i.name.as_str())).collect();
        let categories: StringArray = data.iter().map(|i| Some(i.category.to_string())).collect();
        let regions: StringArray = data.iter().map(|i| Some(region_str(i.region))).collect();

        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(symbols) as ArrayRef,
                Arc::new(names),
                Arc::new(categories),
                Arc::new(regions),
                Arc::new(list_array),
            ],
        )
        .map_err(arrow_err)
    }

    // 将品种数据保存到Arrow文件
    pub fn save_instruments_to_arrow(data: &[Instrument], path: &Path) -> Result<()> {
        info!("Saving {} instruments to {}", data.len(), path.display());

        let batch = instruments_to_record_batch(data)?;
        let file = File::create(path)?;
        let mut writer = FileWriter::try_new(file, &batch.schema()).map_err(arrow_err)?;
        writer.write(&batch).map_err(arrow_err)?;
        writer.finish().map_err(arrow_err)?;

        Ok(())
    }

    // 从Arrow文件读取品种数据
    pub fn read_instruments_from_arrow(path: &Path) -> Result<Vec<Instrument>> {
        let file = File::open(path)?;
        let reader = FileReader::try_new(file, None).map_err(arrow_err)?;

        let mut result = Vec::new();
        for batch in reader {
            let batch = batch.map_err(arrow_err)?;

            let string_column = |idx: usize, name: &str| {
                batch
                    .column(idx)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| ReportError::ArrowError(format!("Failed to downcast {} column", name)))
            };
            let symbols = string_column(0, "symbol")?;
            let names = string_column(1, "name")?;
            let categories = string_column(2, "category")?;
            let regions = string_column(3, "region")?;
            let daily = batch
                .column(4)
                .as_any()
                .downcast_ref::<ListArray>()
                .ok_or_else(|| ReportError::ArrowError("Failed to downcast daily column".to_string()))?;

            for i in 0..batch.num_rows() {
                let category: Category = categories.value(i).parse().map_err(ReportError::ArrowError)?;
                let region = if regions.value(i) == "india" { Region::India } else { Region::Global };

                let series = if daily.is_null(i) {
                    Vec::new()
                } else {
                    read_series(daily.value(i).as_ref())?
                };

                result.push(Instrument {
                    symbol: symbols.value(i).to_string(),
                    name: names.value(i).to_string(),
                    category,
                    region,
                    series,
                });
            }
        }

        Ok(result)
    }

    fn read_series(list: &dyn Array) -> Result<Vec<DailyBar>> {
        let daily_struct = list
            .as_any()
            .downcast_ref::<StructArray>()
            .ok_or_else(|| ReportError::ArrowError("Failed to downcast daily struct".to_string()))?;

        let f64_column = |name: &str| {
            daily_struct
                .column_by_name(name)
                .and_then(|a| a.as_any().downcast_ref::<Float64Array>())
        };

        match (
            daily_struct
                .column_by_name("date")
                .and_then(|a| a.as_any().downcast_ref::<Date32Array>()),
            f64_column("open"),
            f64_column("high"),
            f64_column("low"),
            f64_column("close"),
            daily_struct
                .column_by_name("volume")
                .and_then(|a| a.as_any().downcast_ref::<UInt64Array>()),
        ) {
            (Some(dates), Some(opens), Some(highs), Some(lows), Some(closes), Some(volumes)) => {
                let mut series = Vec::with_capacity(daily_struct.len());
                for j in 0..daily_struct.len() {
                    series.push(DailyBar {
                        date: days_to_date(dates.value(j)),
                        open: opens.value(j),
                        high: highs.value(j),
                        low: lows.value(j),
                        close: closes.value(j),
                        volume: volumes.value(j),
                    });
                }
                Ok(series)
            }
            _ => Err(ReportError::ArrowError("Missing required columns in daily data".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::arrow_utils::*;
    use super::*;
    use crate::models::instrument::{Category, DailyBar, Instrument, Region};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Symbol")]
        symbol: &'static str,
        #[serde(rename = "Change%")]
        change: Option<f64>,
    }

    #[test]
    fn save_csv_skips_empty_tables() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<Row> = Vec::new();
        assert!(save_csv(&rows, dir.path(), "empty").unwrap().is_none());
        assert!(!dir.path().join("empty.csv").exists());
    }

    #[test]
    fn save_csv_writes_headers() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            Row { symbol: "TCS", change: Some(1.5) },
            Row { symbol: "INFY", change: None },
        ];
        let path = save_csv(&rows, dir.path(), "movers").unwrap().unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "Symbol,Change%\nTCS,1.5\nINFY,\n");
    }

    #[test]
    fn save_json_is_readable() {
        let dir = TempDir::new().unwrap();
        let path = save_json(&vec!["a", "b"], dir.path(), "list").unwrap();
        let back: Vec<String> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, vec!["a", "b"]);
    }

    #[test]
    fn ensure_dirs_creates_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("output").join("charts");
        ensure_dirs(&[nested.as_path()]).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn arrow_history_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.arrow");
        let instruments = vec![
            Instrument {
                symbol: "GC=F".to_string(),
                name: "Gold".to_string(),
                category: Category::Commodity,
                region: Region::Global,
                series: vec![DailyBar {
                    date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                    open: 2900.0,
                    high: 2925.5,
                    low: 2890.0,
                    close: 2910.25,
                    volume: 12_345,
                }],
            },
            Instrument {
                symbol: "^NSEI".to_string(),
                name: "NIFTY 50".to_string(),
                category: Category::Index,
                region: Region::India,
                series: Vec::new(),
            },
        ];

        save_instruments_to_arrow(&instruments, &path).unwrap();
        let back = read_instruments_from_arrow(&path).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0].series, instruments[0].series);
        assert_eq!(back[1].region, Region::India);
        assert!(back[1].series.is_empty());
    }
}
