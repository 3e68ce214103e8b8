//! MACD histogram three-day turn advice.

use crate::frame::{Advice, Cell, Column, PriceSeries};

/// Buy after three days of a negative but recovering histogram, sell after
/// three days of decline regardless of sign.
///
/// Reads `macd_hist` and `macd_hist_diff`; undefined inputs never satisfy a
/// condition, so warm-up rows stay neutral.
pub(super) fn apply(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let hist = series.num(i, Column::MacdHist);
        let diff = |n: usize| match i.checked_sub(n) {
            Some(j) => series.num(j, Column::MacdHistDiff),
            None => f64::NAN,
        };
        let buy = hist < 0.0 && diff(0) > 0.0 && diff(1) > 0.0 && diff(2) > 0.0;
        let sell = diff(0) < 0.0 && diff(1) < 0.0 && diff(2) < 0.0;
        let advice = if buy {
            Advice::Buy
        } else if sell {
            Advice::Sell
        } else {
            Advice::Neutral
        };
        series.set(i, Column::MacdAdvice, Cell::Advice(advice));
    }
}
