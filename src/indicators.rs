//! Technical indicator kernels.
//!
//! Every function maps a close (or volume) slice to an equally long output
//! vector. Positions that fall inside an indicator's warm-up window hold
//! `NaN`, the undefined marker, and any computation fed an undefined input
//! stays undefined. Inputs shorter than a warm-up window yield an all-`NaN`
//! vector rather than an error.

use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::frame::{Column, PriceSeries};

/// Default fast EMA period of the MACD line.
pub const MACD_FAST: usize = 12;
/// Default slow EMA period of the MACD line.
pub const MACD_SLOW: usize = 26;
/// Default smoothing period of the MACD signal line.
pub const MACD_SIGNAL: usize = 9;
/// Default Bollinger window.
pub const BOLLINGER_PERIOD: usize = 20;
/// Default Bollinger band width in standard deviations.
pub const BOLLINGER_K: f64 = 2.0;
/// Default momentum lookback.
pub const MOMENTUM_PERIOD: usize = 10;

/// Simple moving average over `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values and smoothed with `alpha = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    let mut prev = seed;
    for i in period..values.len() {
        prev = values[i] * alpha + prev * (1.0 - alpha);
        out[i] = prev;
    }
    out
}

/// Wilder RSI over `period` steps of change.
///
/// The first defined output sits at index `period` (it needs `period` price
/// changes). A move against an all-zero opposite side saturates at 100 or 0;
/// a perfectly flat window reads as 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_point(avg_gain, avg_loss);
    for i in (period + 1)..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_point(avg_gain, avg_loss);
    }
    out
}

fn rsi_point(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line: `EMA(fast) - EMA(slow)`.
pub fn macd(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast = ema(values, fast);
    let slow = ema(values, slow);
    fast.iter().zip(slow).map(|(f, s)| f - s).collect()
}

/// MACD signal line: EMA of the defined portion of the MACD line.
pub fn macd_signal(macd_line: &[f64], period: usize) -> Vec<f64> {
    let start = match macd_line.iter().position(|v| !v.is_nan()) {
        Some(start) => start,
        None => return vec![f64::NAN; macd_line.len()],
    };
    let mut out = vec![f64::NAN; macd_line.len()];
    let tail = ema(&macd_line[start..], period);
    out[start..].copy_from_slice(&tail);
    out
}

/// Bollinger bands: `(lower, upper)` at `k` population standard deviations
/// around the `period`-day SMA.
pub fn bollinger(values: &[f64], period: usize, k: f64) -> (Vec<f64>, Vec<f64>) {
    let mid = sma(values, period);
    let mut lower = vec![f64::NAN; values.len()];
    let mut upper = vec![f64::NAN; values.len()];
    for i in 0..values.len() {
        if mid[i].is_nan() {
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let variance = window.iter().map(|v| (v - mid[i]).powi(2)).sum::<f64>() / period as f64;
        let band = k * variance.sqrt();
        lower[i] = mid[i] - band;
        upper[i] = mid[i] + band;
    }
    (lower, upper)
}

/// First difference: `values[i] - values[i - 1]`, undefined at index 0.
///
/// Applied to moving averages it reads as the average's daily slope;
/// undefined inputs stay undefined.
pub fn slope(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] - values[i - 1];
    }
    out
}

/// Fractional change over `period` steps: `values[i] / values[i - period] - 1`.
pub fn momentum(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in period..values.len() {
        out[i] = values[i] / values[i - period] - 1.0;
    }
    out
}

/// The closed registry of indicator passes a pipeline can request.
///
/// Each variant knows which columns it writes; [`IndicatorSpec::apply`] runs
/// the kernel over one ticker's series and stores the outputs in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorSpec {
    /// Wilder RSI over the given period.
    Rsi(usize),
    /// MACD line, signal line and histogram (12/26/9).
    Macd,
    /// Bollinger lower/upper bands (20-day, 2 standard deviations).
    Bollinger,
    /// Simple moving average of the close over the given period.
    Sma(usize),
    /// Daily slope of the SMA over the given period.
    SmaSlope(usize),
    /// Fractional momentum over the given period.
    Momentum(usize),
    /// 20-day simple moving average of the traded volume.
    VolumeMa,
}

impl IndicatorSpec {
    /// Returns the configuration name of the indicator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rsi(_) => "rsi",
            Self::Macd => "macd",
            Self::Bollinger => "bb",
            Self::Sma(20) => "ma_20",
            Self::Sma(50) => "ma_50",
            Self::Sma(_) => "ma_200",
            Self::SmaSlope(20) => "ma_20_slope",
            Self::SmaSlope(50) => "ma_50_slope",
            Self::SmaSlope(_) => "ma_200_slope",
            Self::Momentum(_) => "momentum_10",
            Self::VolumeMa => "volume_ma",
        }
    }

    /// Computes the indicator and writes its columns onto the series.
    pub fn apply(&self, series: &mut PriceSeries) -> Result<()> {
        let closes = series.closes();
        match *self {
            Self::Rsi(period) => {
                check_period("rsi", period)?;
                series.set_column(Column::Rsi, rsi(&closes, period));
            }
            Self::Macd => {
                let line = macd(&closes, MACD_FAST, MACD_SLOW);
                let signal = macd_signal(&line, MACD_SIGNAL);
                let hist = line
                    .iter()
                    .zip(&signal)
                    .map(|(l, s)| l - s)
                    .collect::<Vec<_>>();
                series.set_column(Column::MacdHistDiff, slope(&hist));
                series.set_column(Column::Macd, line);
                series.set_column(Column::MacdSignal, signal);
                series.set_column(Column::MacdHist, hist);
            }
            Self::Bollinger => {
                let (lower, upper) = bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_K);
                series.set_column(Column::BbLower, lower);
                series.set_column(Column::BbUpper, upper);
            }
            Self::Sma(period) => {
                check_period("ma", period)?;
                series.set_column(sma_column(period)?, sma(&closes, period));
            }
            Self::SmaSlope(period) => {
                check_period("ma_slope", period)?;
                series.set_column(slope_column(period)?, slope(&sma(&closes, period)));
            }
            Self::Momentum(period) => {
                check_period("momentum", period)?;
                series.set_column(Column::Momentum, momentum(&closes, period));
            }
            Self::VolumeMa => {
                let volumes = series.volumes();
                series.set_column(Column::VolumeMa, sma(&volumes, 20));
            }
        }
        Ok(())
    }
}

fn check_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(Error::InvalidPeriod(format!("{name} period must be > 0")));
    }
    Ok(())
}

fn sma_column(period: usize) -> Result<Column> {
    match period {
        20 => Ok(Column::Ma20),
        50 => Ok(Column::Ma50),
        200 => Ok(Column::Ma200),
        other => Err(Error::InvalidPeriod(format!(
            "no registered column for ma_{other}"
        ))),
    }
}

fn slope_column(period: usize) -> Result<Column> {
    match period {
        20 => Ok(Column::Ma20Slope),
        50 => Ok(Column::Ma50Slope),
        200 => Ok(Column::Ma200Slope),
        other => Err(Error::InvalidPeriod(format!(
            "no registered column for ma_{other}_slope"
        ))),
    }
}

impl FromStr for IndicatorSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rsi" => Ok(Self::Rsi(14)),
            // component names resolve to the pass that computes them
            "macd" | "macd_signal" | "macd_hist" => Ok(Self::Macd),
            "bb" | "bb_lower" | "bb_upper" => Ok(Self::Bollinger),
            "ma_20" => Ok(Self::Sma(20)),
            "ma_50" => Ok(Self::Sma(50)),
            "ma_200" => Ok(Self::Sma(200)),
            "ma_20_slope" => Ok(Self::SmaSlope(20)),
            "ma_50_slope" => Ok(Self::SmaSlope(50)),
            "ma_200_slope" => Ok(Self::SmaSlope(200)),
            "momentum_10" => Ok(Self::Momentum(MOMENTUM_PERIOD)),
            "volume_ma" => Ok(Self::VolumeMa),
            other => Err(Error::UnknownIndicator(other.to_string())),
        }
    }
}
