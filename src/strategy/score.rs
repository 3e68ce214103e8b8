//! Trend-gated score passes and the weighted `main_advice` fold.
//!
//! Each score pass writes a value in `[-1, 1]`: positive leans buy, negative
//! leans sell, undefined inputs stay undefined. All three read the `trend`
//! label written by the trend pass; in a downtrend only sell-side evidence
//! counts and buy-side evidence scores zero.

use crate::frame::{Advice, Cell, Column, PriceSeries};

// Keeps the spread ratios finite when the denominator sits at zero.
const EPS: f64 = 1e-5;

fn gated(trend: Option<&str>, value: f64) -> f64 {
    match trend {
        Some("uptrend") | Some("sideways") => value.clamp(-1.0, 1.0),
        Some("downtrend") => {
            if value < 0.0 {
                value.max(-1.0)
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Scaled 20-over-50 average spread, gated by the trend label.
pub(super) fn apply_ma(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let short = series.num(i, Column::Ma20);
        let medium = series.num(i, Column::Ma50);
        let value = (short - medium) / (medium + EPS);
        let score = gated(series.text(i, Column::Trend), value);
        series.set(i, Column::MaScore, Cell::Num(score));
    }
}

/// Scaled MACD-over-signal spread, gated by the trend label.
pub(super) fn apply_macd(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let line = series.num(i, Column::Macd);
        let signal = series.num(i, Column::MacdSignal);
        let value = (line - signal) / (signal.abs() + EPS);
        let score = gated(series.text(i, Column::Trend), value);
        series.set(i, Column::MacdScore, Cell::Num(score));
    }
}

/// RSI distance below the 50 midline, gated by the trend label. An oversold
/// reading scores towards +1, an overbought one towards -1.
pub(super) fn apply_rsi(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let rsi = series.num(i, Column::Rsi);
        let value = (50.0 - rsi) / 50.0;
        let score = gated(series.text(i, Column::Trend), value);
        series.set(i, Column::RsiScore, Cell::Num(score));
    }
}

/// Weighted sum of score columns folded into `main_advice`.
///
/// The signed sum is compared against the thresholds; the stored
/// `main_advice_score` is its absolute value, a conviction magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMainAdvice {
    /// Score columns and their weights.
    pub weights: Vec<(Column, f64)>,
    /// A signed sum above this is a buy.
    pub buy_threshold: f64,
    /// A signed sum below the negation of this is a sell.
    pub sell_threshold: f64,
}

impl Default for WeightedMainAdvice {
    fn default() -> Self {
        Self {
            weights: vec![
                (Column::RsiScore, 0.3),
                (Column::MacdScore, 0.4),
                (Column::MaScore, 0.3),
            ],
            buy_threshold: 0.3,
            sell_threshold: 0.3,
        }
    }
}

pub(super) fn apply_weighted(weighted: &WeightedMainAdvice, series: &mut PriceSeries) {
    for i in 0..series.len() {
        let sum: f64 = weighted
            .weights
            .iter()
            .map(|(column, weight)| weight * series.num(i, *column))
            .sum();
        let advice = if sum > weighted.buy_threshold {
            Advice::Buy
        } else if sum < -weighted.sell_threshold {
            Advice::Sell
        } else {
            Advice::Hold
        };
        series.set(i, Column::MainAdvice, Cell::Advice(advice));
        series.set(i, Column::MainAdviceScore, Cell::Num(sum.abs()));
    }
}
