//! Support/resistance level revisits.

use chrono::NaiveDate;
use tracing::debug;

use crate::frame::{Advice, Cell, Column, PriceSeries};

/// Local-extrema level detection with revisit confirmation.
///
/// A day whose close is the minimum (maximum) of its `window`-day
/// neighbourhood on both sides is a support (resistance) candidate. The
/// signal lands `window` rows later, on the confirmation day, and only when
/// a previously confirmed level at or beyond the candidate price exists and
/// enough calendar days have passed since that level was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportResistance {
    /// Neighbourhood half-width for extrema detection, also the confirmation lag.
    pub window: usize,
    /// Minimum elapsed days since the matched support for a buy.
    pub buy_min_window: i64,
    /// Minimum elapsed days since the matched resistance for a sell.
    pub sell_min_window: i64,
}

impl Default for SupportResistance {
    fn default() -> Self {
        Self {
            window: 3,
            buy_min_window: 30,
            sell_min_window: 30,
        }
    }
}

pub(super) fn apply(params: &SupportResistance, series: &mut PriceSeries) {
    let closes = series.closes();
    let dates: Vec<NaiveDate> = series.rows().map(|r| r.bar().date()).collect();
    let n = closes.len();
    let w = params.window;

    for i in 0..n {
        series.set(i, Column::SupResAdvice, Cell::Advice(Advice::Hold));
        series.set(i, Column::SupResWindow, Cell::Int(0));
        series.set(i, Column::DetectedClose, Cell::Num(f64::NAN));
    }
    if n <= 2 * w {
        return;
    }

    let is_extremum = |i: usize, max: bool| {
        let slice = &closes[i - w..=i + w];
        if max {
            closes[i] == slice.iter().copied().fold(f64::MIN, f64::max)
        } else {
            closes[i] == slice.iter().copied().fold(f64::MAX, f64::min)
        }
    };

    // (level price, confirmation date) of every detected level so far
    let mut supports: Vec<(f64, NaiveDate)> = Vec::new();
    let mut resistances: Vec<(f64, NaiveDate)> = Vec::new();

    for i in w..(n - w) {
        let j = i + w;
        let price = closes[i];

        if is_extremum(i, false) {
            let last_match = supports
                .iter()
                .filter(|(p, _)| *p <= price)
                .map(|(_, d)| *d)
                .max();
            if let Some(matched) = last_match {
                let elapsed = (dates[j] - matched).num_days();
                series.set(i, Column::SupResWindow, Cell::Int(elapsed));
                series.set(j, Column::SupResWindow, Cell::Int(elapsed));
                if elapsed > params.buy_min_window {
                    debug!(ticker = series.ticker(), elapsed, price, "support revisit");
                    series.set(j, Column::SupResAdvice, Cell::Advice(Advice::Buy));
                    series.set(j, Column::DetectedClose, Cell::Num(price));
                }
            }
            supports.push((price, dates[j]));
        }

        if is_extremum(i, true) {
            let last_match = resistances
                .iter()
                .filter(|(p, _)| *p >= price)
                .map(|(_, d)| *d)
                .max();
            if let Some(matched) = last_match {
                let elapsed = -(dates[j] - matched).num_days();
                series.set(i, Column::SupResWindow, Cell::Int(elapsed));
                series.set(j, Column::SupResWindow, Cell::Int(elapsed));
                if elapsed < -params.sell_min_window {
                    debug!(ticker = series.ticker(), elapsed, price, "resistance revisit");
                    series.set(j, Column::SupResAdvice, Cell::Advice(Advice::Sell));
                    series.set(j, Column::DetectedClose, Cell::Num(price));
                }
            }
            resistances.push((price, dates[j]));
        }
    }
}
