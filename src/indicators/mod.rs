//! 技术指标计算
//!
//! 所有函数都是输入序列的纯函数，序列按时间升序排列（最新值在最后）。
//! 窗口长度大于输入长度时返回 `IndicatorError::InsufficientData`，不会 panic。

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::instrument::Instrument;

pub const SMA_PERIOD: usize = 20;
pub const EMA_FAST_SPAN: usize = 9;
pub const EMA_SLOW_SPAN: usize = 15;
pub const SUPPORT_RESISTANCE_WINDOW: usize = 20;
pub const TREND_WINDOW: usize = 10;
const TREND_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: required {required}, available {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type IndicatorResult<T> = std::result::Result<T, IndicatorError>;

fn check_window(values: &[f64], window: usize) -> IndicatorResult<()> {
    if window == 0 {
        return Err(IndicatorError::InvalidParameter("window must be greater than 0".to_string()));
    }
    if values.len() < window {
        return Err(IndicatorError::InsufficientData {
            required: window,
            available: values.len(),
        });
    }
    Ok(())
}

/// 百分比变化，基数为 0 时无定义
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// 最近 `period` 个值的算术平均
pub fn sma(values: &[f64], period: usize) -> IndicatorResult<f64> {
    check_window(values, period)?;
    let window = &values[values.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

/// 滚动 SMA，前 `period - 1` 个位置为 None
pub fn sma_series(values: &[f64], period: usize) -> IndicatorResult<Vec<Option<f64>>> {
    check_window(values, period)?;

    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }
    Ok(result)
}

/// Exponential moving average seeded with the first value.
///
/// alpha = 2 / (span + 1); each point is `alpha * x + (1 - alpha) * prev`.
pub fn ema_series(values: &[f64], span: usize) -> IndicatorResult<Vec<f64>> {
    check_window(values, span)?;

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);
    for value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        result.push(prev);
    }
    Ok(result)
}

pub fn ema(values: &[f64], span: usize) -> IndicatorResult<f64> {
    let series = ema_series(values, span)?;
    series
        .last()
        .copied()
        .ok_or(IndicatorError::InsufficientData { required: span, available: 0 })
}

/// MACD 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// MACD 线、信号线与柱状图，与输入等长
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], params: MacdParams) -> IndicatorResult<MacdSeries> {
    if params.fast >= params.slow {
        return Err(IndicatorError::InvalidParameter(format!(
            "fast span {} must be shorter than slow span {}",
            params.fast, params.slow
        )));
    }
    check_window(values, params.slow.max(params.signal))?;

    let fast = ema_series(values, params.fast)?;
    let slow = ema_series(values, params.slow)?;
    let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&macd_line, params.signal)?;
    let histogram = macd_line.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(MacdSeries {
        macd: macd_line,
        signal,
        histogram,
    })
}

/// 最近窗口内的最低价（支撑）与最高价（阻力）
pub fn support_resistance(values: &[f64], window: usize) -> IndicatorResult<(f64, f64)> {
    check_window(values, window)?;
    let tail = &values[values.len() - window..];
    let support = tail.iter().copied().fold(f64::INFINITY, f64::min);
    let resistance = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((support, resistance))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Up => "Up",
            TrendDirection::Down => "Down",
            TrendDirection::Sideways => "Sideways",
        };
        f.write_str(s)
    }
}

/// 最近窗口的最小二乘斜率判断短期趋势
pub fn trend_direction(values: &[f64], window: usize) -> IndicatorResult<(TrendDirection, f64)> {
    if window < 2 {
        return Err(IndicatorError::InvalidParameter("trend window must be at least 2".to_string()));
    }
    check_window(values, window)?;

    let y = &values[values.len() - window..];
    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, value) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (value - y_mean);
        den += dx * dx;
    }
    let slope = num / den;

    let direction = if slope > TREND_TOLERANCE {
        TrendDirection::Up
    } else if slope < -TREND_TOLERANCE {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    };
    Ok((direction, slope))
}

/// 单个指标的计算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorValue {
    Value { value: f64 },
    Macd { macd: f64, signal: f64, histogram: f64 },
    Trend { direction: TrendDirection, slope: f64 },
    Undefined { reason: String },
    InsufficientData { required: usize, available: usize },
}

impl IndicatorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndicatorValue::Value { value } => Some(*value),
            _ => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, IndicatorValue::InsufficientData { .. })
    }
}

impl<T> From<IndicatorResult<T>> for IndicatorValue
where
    T: Into<IndicatorValue>,
{
    fn from(result: IndicatorResult<T>) -> Self {
        match result {
            Ok(v) => v.into(),
            Err(IndicatorError::InsufficientData { required, available }) => {
                IndicatorValue::InsufficientData { required, available }
            }
            Err(IndicatorError::InvalidParameter(reason)) => IndicatorValue::Undefined { reason },
        }
    }
}

impl From<f64> for IndicatorValue {
    fn from(value: f64) -> Self {
        IndicatorValue::Value { value }
    }
}

/// 某个品种的全部指标，按名称排序
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub name: String,
    pub values: BTreeMap<String, IndicatorValue>,
}

impl IndicatorReport {
    pub fn get(&self, key: &str) -> Option<&IndicatorValue> {
        self.values.get(key)
    }
}

pub fn sma_key(period: usize) -> String {
    format!("sma_{}", period)
}

pub fn ema_key(span: usize) -> String {
    format!("ema_{}", span)
}

pub const MACD_KEY: &str = "macd";
pub const CHANGE_KEY: &str = "change_1d_pct";

pub fn support_key(window: usize) -> String {
    format!("support_{}", window)
}

pub fn resistance_key(window: usize) -> String {
    format!("resistance_{}", window)
}

pub fn trend_key(window: usize) -> String {
    format!("trend_{}", window)
}

/// Computes the fixed indicator set for one instrument.
///
/// Every key is always present; short series produce `InsufficientData` entries.
pub fn compute_indicators(instrument: &Instrument) -> IndicatorReport {
    let closes = instrument.closes();
    let mut values: BTreeMap<String, IndicatorValue> = BTreeMap::new();

    values.insert(sma_key(SMA_PERIOD), sma(&closes, SMA_PERIOD).into());
    values.insert(ema_key(EMA_FAST_SPAN), ema(&closes, EMA_FAST_SPAN).into());
    values.insert(ema_key(EMA_SLOW_SPAN), ema(&closes, EMA_SLOW_SPAN).into());

    let macd_value = match macd(&closes, MacdParams::default()) {
        Ok(series) => match (series.macd.last(), series.signal.last(), series.histogram.last()) {
            (Some(&m), Some(&s), Some(&h)) => IndicatorValue::Macd {
                macd: m,
                signal: s,
                histogram: h,
            },
            _ => IndicatorValue::InsufficientData {
                required: MacdParams::default().slow,
                available: closes.len(),
            },
        },
        Err(e) => IndicatorResult::<f64>::Err(e).into(),
    };
    values.insert(MACD_KEY.to_string(), macd_value);

    let change = if closes.len() < 2 {
        IndicatorValue::InsufficientData {
            required: 2,
            available: closes.len(),
        }
    } else {
        let last = closes[closes.len() - 1];
        let prev = closes[closes.len() - 2];
        match pct_change(last, prev) {
            Some(v) => IndicatorValue::Value { value: v },
            None => IndicatorValue::Undefined {
                reason: "previous close is zero".to_string(),
            },
        }
    };
    values.insert(CHANGE_KEY.to_string(), change);

    match support_resistance(&closes, SUPPORT_RESISTANCE_WINDOW) {
        Ok((support, resistance)) => {
            values.insert(support_key(SUPPORT_RESISTANCE_WINDOW), support.into());
            values.insert(resistance_key(SUPPORT_RESISTANCE_WINDOW), resistance.into());
        }
        Err(e) => {
            let marker: IndicatorValue = IndicatorResult::<f64>::Err(e).into();
            values.insert(support_key(SUPPORT_RESISTANCE_WINDOW), marker.clone());
            values.insert(resistance_key(SUPPORT_RESISTANCE_WINDOW), marker);
        }
    }

    let trend = match trend_direction(&closes, TREND_WINDOW) {
        Ok((direction, slope)) => IndicatorValue::Trend { direction, slope },
        Err(e) => IndicatorResult::<f64>::Err(e).into(),
    };
    values.insert(trend_key(TREND_WINDOW), trend);

    IndicatorReport {
        symbol: instrument.symbol.clone(),
        name: instrument.name.clone(),
        values,
    }
}
