//! Four-phase cycle classification.

use crate::frame::{Advice, Cell, Column, PriceSeries};

/// The four recognized phases of a price cycle, plus the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Averages stacked bullishly with higher highs and higher lows.
    ProvenPerformance,
    /// Quiet drift inside the bands with a fading MACD.
    ConsolidationBase,
    /// Close above the upper band with the MACD turned up.
    ConsolidationBreakout,
    /// Momentum breakout above rising averages; the only buy phase.
    NewTrend,
    /// No phase test passed, or inputs still warming up.
    Undefined,
}

impl Phase {
    /// Returns the label written into the `phase` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProvenPerformance => "proven_performance",
            Self::ConsolidationBase => "consolidation_base",
            Self::ConsolidationBreakout => "consolidation_breakout",
            Self::NewTrend => "new_trend",
            Self::Undefined => "undefined",
        }
    }
}

struct Inputs {
    close: f64,
    ma_50: f64,
    ma_200: f64,
    ma_50_slope: f64,
    ma_200_slope: f64,
    bb_lower: f64,
    bb_upper: f64,
    momentum: f64,
    macd: f64,
    macd_signal: f64,
}

fn classify(row: &Inputs, prev_high: f64, prev_low: f64) -> Phase {
    if row.ma_50 > row.ma_200
        && row.ma_200_slope > 0.0
        && row.close > prev_high
        && row.close > prev_low
    {
        return Phase::ProvenPerformance;
    }
    if row.close < row.bb_upper
        && row.close > row.bb_lower
        && row.momentum.abs() < 0.01
        && row.macd < row.macd_signal
    {
        return Phase::ConsolidationBase;
    }
    if row.close > row.bb_upper && row.macd > row.macd_signal {
        return Phase::ConsolidationBreakout;
    }
    if row.close > row.ma_50
        && row.ma_50 > row.ma_200
        && row.ma_50_slope > 0.0
        && row.momentum > 0.02
    {
        return Phase::NewTrend;
    }
    Phase::Undefined
}

/// Classifies each row into a phase, carrying the running high/low marks
/// forward. Only a `new_trend` breakout is a buy; everything else is
/// neutral. Undefined indicator inputs fail every phase test, so warm-up
/// rows classify as undefined.
pub(super) fn apply(series: &mut PriceSeries) {
    if series.is_empty() {
        return;
    }
    let first_close = series.row(0).map(|r| r.bar().close()).unwrap_or(f64::NAN);
    let mut prev_high = first_close;
    let mut prev_low = first_close;

    for i in 0..series.len() {
        let close = series.row(i).map(|r| r.bar().close()).unwrap_or(f64::NAN);
        let inputs = Inputs {
            close,
            ma_50: series.num(i, Column::Ma50),
            ma_200: series.num(i, Column::Ma200),
            ma_50_slope: series.num(i, Column::Ma50Slope),
            ma_200_slope: series.num(i, Column::Ma200Slope),
            bb_lower: series.num(i, Column::BbLower),
            bb_upper: series.num(i, Column::BbUpper),
            momentum: series.num(i, Column::Momentum),
            macd: series.num(i, Column::Macd),
            macd_signal: series.num(i, Column::MacdSignal),
        };
        let phase = classify(&inputs, prev_high, prev_low);
        if matches!(phase, Phase::ProvenPerformance | Phase::NewTrend) {
            prev_high = prev_high.max(close);
            prev_low = prev_low.min(close);
        }
        let advice = if phase == Phase::NewTrend {
            Advice::Buy
        } else {
            Advice::Neutral
        };
        series.set(i, Column::Phase, Cell::text(phase.as_str()));
        series.set(i, Column::PhaseAdvice, Cell::Advice(advice));
    }
}
