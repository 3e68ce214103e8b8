//! Moving-average crossover and trend labelling passes.

use super::MaTerm;
use crate::frame::{Advice, Cell, Column, PriceSeries};

/// Crossover of a short average over a longer one, labelled as advice.
///
/// Undefined averages never compare true and read as neutral, so the pass
/// stays silent through the warm-up window.
pub(super) fn apply_term(term: MaTerm, series: &mut PriceSeries) {
    let (short, long, out) = match term {
        MaTerm::Short => (Column::Ma20, Column::Ma50, Column::MaTrendShort),
        MaTerm::Long => (Column::Ma50, Column::Ma200, Column::MaTrendLong),
    };
    for i in 0..series.len() {
        let s = series.num(i, short);
        let l = series.num(i, long);
        let advice = if s > l {
            Advice::Buy
        } else if s < l {
            Advice::Sell
        } else {
            Advice::Neutral
        };
        series.set(i, out, Cell::Advice(advice));
    }
}

/// Labels each row `uptrend`, `downtrend` or `sideways` from the 20/50/200
/// average stack. A broken or undefined stack is sideways.
pub(super) fn apply_trend(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let short = series.num(i, Column::Ma20);
        let medium = series.num(i, Column::Ma50);
        let long = series.num(i, Column::Ma200);
        let trend = if short > medium && medium > long {
            "uptrend"
        } else if short < medium && medium < long {
            "downtrend"
        } else {
            "sideways"
        };
        series.set(i, Column::Trend, Cell::text(trend));
    }
}
