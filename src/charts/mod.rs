//! PNG 图表渲染
//!
//! 图表只包含图形元素（网格、线、K线、柱），标题与说明文字由 PDF 报告负责。

use log::debug;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::errors::{ReportError, Result};
use crate::indicators::{macd, sma_series, MacdParams, SMA_PERIOD};
use crate::models::instrument::{DailyBar, Instrument};

pub const CHART_SIZE: (u32, u32) = (960, 600);
pub const CANDLE_BARS: usize = 60;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const GRID: RGBColor = RGBColor(225, 225, 225);
const GAIN: RGBColor = RGBColor(38, 166, 91);
const LOSS: RGBColor = RGBColor(214, 69, 65);

/// 将名称转换为文件名，保留 `^` 等代码字符
pub fn chart_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    format!("{}.png", cleaned)
}

/// 数值范围，上下留 5% 边距
fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let pad = if max > min { (max - min) * 0.05 } else { min.abs().max(1.0) * 0.01 };
    Some((min - pad, max + pad))
}

fn x_range(len: usize) -> std::ops::Range<f64> {
    -0.5..(len.max(1) as f64 - 0.5)
}

pub struct ChartRenderer {
    dir: PathBuf,
    size: (u32, u32),
}

impl ChartRenderer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            size: CHART_SIZE,
        }
    }

    pub fn chart_path(&self, name: &str) -> PathBuf {
        self.dir.join(chart_file_name(name))
    }

    fn finish(&self, name: &str, result: DrawResult) -> Result<Option<PathBuf>> {
        let path = self.chart_path(name);
        result.map_err(|e| ReportError::ChartError(format!("{}: {}", path.display(), e)))?;
        debug!("Rendered chart {}", path.display());
        Ok(Some(path))
    }

    /// 收盘价折线，叠加 SMA(20)。文件名为 `<symbol>.png`。
    pub fn line_chart(&self, instrument: &Instrument) -> Result<Option<PathBuf>> {
        let closes = instrument.closes();
        if closes.is_empty() {
            return Ok(None);
        }
        let overlay = sma_series(&closes, SMA_PERIOD).unwrap_or_default();
        let path = self.chart_path(&instrument.symbol);
        let result = draw_line(&path, self.size, &closes, &overlay);
        self.finish(&instrument.symbol, result)
    }

    /// 最近 `bars` 根日K线。文件名为 `<symbol>_candle.png`。
    pub fn candlestick_chart(&self, instrument: &Instrument, bars: usize) -> Result<Option<PathBuf>> {
        if instrument.series.is_empty() {
            return Ok(None);
        }
        let start = instrument.series.len().saturating_sub(bars);
        let name = format!("{}_candle", instrument.symbol);
        let path = self.chart_path(&name);
        let result = draw_candles(&path, self.size, &instrument.series[start..]);
        self.finish(&name, result)
    }

    /// MACD 与信号线，数据不足时跳过。文件名为 `<symbol>_macd.png`。
    pub fn macd_chart(&self, instrument: &Instrument) -> Result<Option<PathBuf>> {
        let series = match macd(&instrument.closes(), MacdParams::default()) {
            Ok(series) => series,
            Err(e) => {
                debug!("Skipping MACD chart for {}: {}", instrument.symbol, e);
                return Ok(None);
            }
        };
        let name = format!("{}_macd", instrument.symbol);
        let path = self.chart_path(&name);
        let result = draw_macd(&path, self.size, &series.macd, &series.signal, &series.histogram);
        self.finish(&name, result)
    }

    /// 柱状图，正值绿色、负值红色
    pub fn bar_chart(&self, name: &str, values: &[f64]) -> Result<Option<PathBuf>> {
        if values.is_empty() {
            return Ok(None);
        }
        let path = self.chart_path(name);
        let result = draw_bars(&path, self.size, values);
        self.finish(name, result)
    }
}

fn draw_line(path: &Path, size: (u32, u32), closes: &[f64], overlay: &[Option<f64>]) -> DrawResult {
    let (min, max) = value_range(closes.iter().copied().chain(overlay.iter().flatten().copied()))
        .ok_or("no finite values")?;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range(closes.len()), min..max)?;
    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(8)
        .light_line_style(GRID)
        .draw()?;

    chart.draw_series(LineSeries::new(
        closes.iter().enumerate().map(|(i, &c)| (i as f64, c)),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(LineSeries::new(
        overlay
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64, v))),
        RGBColor(255, 140, 0).stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_candles(path: &Path, size: (u32, u32), bars: &[DailyBar]) -> DrawResult {
    let (min, max) = value_range(bars.iter().flat_map(|b| [b.low, b.high])).ok_or("no finite values")?;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range(bars.len()), min..max)?;
    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(8)
        .light_line_style(GRID)
        .draw()?;

    let body_width = ((size.0 as f64 - 40.0) / bars.len().max(1) as f64 * 0.6).clamp(1.0, 15.0) as u32;
    chart.draw_series(bars.iter().enumerate().map(|(i, b)| {
        CandleStick::new(i as f64, b.open, b.high, b.low, b.close, GAIN.filled(), LOSS.filled(), body_width)
    }))?;

    root.present()?;
    Ok(())
}

fn draw_macd(path: &Path, size: (u32, u32), macd_line: &[f64], signal: &[f64], histogram: &[f64]) -> DrawResult {
    let (min, max) = value_range(
        macd_line
            .iter()
            .chain(signal)
            .chain(histogram)
            .copied()
            .chain(std::iter::once(0.0)),
    )
    .ok_or("no finite values")?;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range(macd_line.len()), min..max)?;
    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(8)
        .light_line_style(GRID)
        .draw()?;

    chart.draw_series(histogram.iter().enumerate().map(|(i, &h)| {
        let color = if h >= 0.0 { GAIN } else { LOSS };
        Rectangle::new([(i as f64 - 0.3, 0.0), (i as f64 + 0.3, h)], color.mix(0.6).filled())
    }))?;
    chart.draw_series(LineSeries::new(
        macd_line.iter().enumerate().map(|(i, &v)| (i as f64, v)),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(LineSeries::new(
        signal.iter().enumerate().map(|(i, &v)| (i as f64, v)),
        RGBColor(255, 140, 0).stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_bars(path: &Path, size: (u32, u32), values: &[f64]) -> DrawResult {
    let (min, max) = value_range(values.iter().copied().chain(std::iter::once(0.0))).ok_or("no finite values")?;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range(values.len()), min..max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_labels(8)
        .light_line_style(GRID)
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
        let color = if v >= 0.0 { GAIN } else { LOSS };
        Rectangle::new([(i as f64 - 0.35, 0.0), (i as f64 + 0.35, v)], color.filled())
    }))?;
    chart.draw_series(LineSeries::new(
        [(-0.5, 0.0), (values.len() as f64 - 0.5, 0.0)],
        BLACK.stroke_width(1),
    ))?;

    root.present()?;
    Ok(())
}
