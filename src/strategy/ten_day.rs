//! Ten-day low entries and ten-day high exits.

use crate::frame::{Advice, Cell, Column, PriceSeries};

const HOLD_LIMIT: i64 = 10;

/// Buys when the close is the ten-day low above both long averages, sells on
/// the ten-day high, a drop below the 50-day average, or after ten held days.
///
/// The pass tracks a single virtual position per series and writes the
/// held-day counter alongside the advice. Scoring fits a least-squares line
/// through the last ten closes and min-max normalizes the slopes over the
/// whole series.
pub(super) fn apply(series: &mut PriceSeries) {
    let closes = series.closes();
    let n = closes.len();
    let mut slopes = vec![f64::NAN; n];

    for i in 0..n {
        series.set(i, Column::TenDaysAdvice, Cell::Advice(Advice::Hold));
        series.set(i, Column::PositionDays, Cell::Int(0));
    }

    let mut position_open = false;
    let mut days_held: i64 = 0;

    // the long averages need 200 rows of history
    for i in 200..n {
        let price = closes[i];
        let window = &closes[i - 9..=i];
        slopes[i] = fit_slope(window);
        let low = window.iter().copied().fold(f64::MAX, f64::min);
        let high = window.iter().copied().fold(f64::MIN, f64::max);
        let ma_50 = series.num(i, Column::Ma50);
        let ma_200 = series.num(i, Column::Ma200);

        if !position_open {
            if price == low && price > ma_50 && price > ma_200 {
                series.set(i, Column::TenDaysAdvice, Cell::Advice(Advice::Buy));
                position_open = true;
                days_held = 1;
            }
        } else {
            days_held += 1;
            if price == high || price < ma_50 || days_held >= HOLD_LIMIT {
                series.set(i, Column::TenDaysAdvice, Cell::Advice(Advice::Sell));
                position_open = false;
                days_held = 0;
            } else {
                series.set(i, Column::PositionDays, Cell::Int(days_held));
            }
        }
    }

    series.set_column(Column::TenDaysScore, normalize(&slopes));
}

/// Least-squares slope of `values` against their index.
fn fit_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (values.len() - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, &y) in values.iter().enumerate() {
        let dx = x as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    num / den
}

/// Min-max normalization over the defined slopes; a degenerate range maps
/// every value to 0.5.
fn normalize(slopes: &[f64]) -> Vec<f64> {
    let defined = slopes.iter().copied().filter(|v| !v.is_nan());
    let min = defined.clone().fold(f64::MAX, f64::min);
    let max = defined.fold(f64::MIN, f64::max);
    if min > max {
        return slopes.to_vec();
    }
    slopes
        .iter()
        .map(|&v| {
            if v.is_nan() {
                v
            } else if max == min {
                0.5
            } else {
                (v - min) / (max - min)
            }
        })
        .collect()
}
