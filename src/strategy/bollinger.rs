//! Bollinger band position and re-entry passes.

use tracing::debug;

use crate::frame::{Advice, Cell, Column, PriceSeries};

const UNDER_LOWER: &str = "underlower";
const OVER_UPPER: &str = "overupper";
const WITHIN: &str = "within_bb";
const UNDEFINED: &str = "undefined";

/// Re-entry advice: advise once the close is back inside the bands after an
/// excursion `days_ago` rows earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BollingerCross {
    /// Lookback for a below-lower-band excursion that turns into a buy.
    pub days_ago_under: usize,
    /// Lookback for an above-upper-band excursion that turns into a sell.
    pub days_ago_over: usize,
}

impl Default for BollingerCross {
    fn default() -> Self {
        Self {
            days_ago_under: 1,
            days_ago_over: 1,
        }
    }
}

/// Writes `bb_state` and the distance-to-band column both variants share.
fn classify(series: &mut PriceSeries) {
    for i in 0..series.len() {
        let close = series.row(i).map(|r| r.bar().close()).unwrap_or(f64::NAN);
        let lower = series.num(i, Column::BbLower);
        let upper = series.num(i, Column::BbUpper);

        let (state, diff) = if lower.is_nan() || upper.is_nan() {
            (UNDEFINED, f64::NAN)
        } else if close < lower {
            (UNDER_LOWER, (close - lower) / close * 100.0)
        } else if close > upper {
            (OVER_UPPER, (close - upper) / close * 100.0)
        } else {
            let to_upper = (close - upper).abs() / close * 100.0;
            let to_lower = (close - lower).abs() / close * 100.0;
            (WITHIN, to_upper.min(to_lower))
        };
        series.set(i, Column::BbState, Cell::text(state));
        series.set(i, Column::BbDiffPercent, Cell::Num(diff));
    }
}

/// Same-day advice: below the lower band is a buy, above the upper a sell.
pub(super) fn apply_same_day(series: &mut PriceSeries) {
    classify(series);
    for i in 0..series.len() {
        let advice = match series.text(i, Column::BbState) {
            Some(UNDER_LOWER) => Advice::Buy,
            Some(OVER_UPPER) => Advice::Sell,
            _ => Advice::Neutral,
        };
        series.set(i, Column::BbAdvice, Cell::Advice(advice));
    }
}

/// Re-entry advice based on the band state `days_ago` rows earlier.
pub(super) fn apply_cross(cross: &BollingerCross, series: &mut PriceSeries) {
    classify(series);
    debug!(
        ticker = series.ticker(),
        days_ago_under = cross.days_ago_under,
        days_ago_over = cross.days_ago_over,
        "applying band re-entry advice"
    );
    for i in 0..series.len() {
        let mut advice = Advice::Neutral;
        if series.text(i, Column::BbState) == Some(WITHIN) {
            let shifted = |n: usize| i.checked_sub(n).and_then(|j| series.text(j, Column::BbState));
            if shifted(cross.days_ago_under) == Some(UNDER_LOWER) {
                advice = Advice::Buy;
            }
            if shifted(cross.days_ago_over) == Some(OVER_UPPER) {
                advice = Advice::Sell;
            }
        }
        series.set(i, Column::BbAdvice, Cell::Advice(advice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PriceBar;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series_with_bands(closes: &[f64], lower: f64, upper: f64) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                PriceBar::from((date, c, c, c, c, 1.0))
            })
            .collect();
        let mut series = PriceSeries::new("TST", bars);
        series.set_column(Column::BbLower, vec![lower; closes.len()]);
        series.set_column(Column::BbUpper, vec![upper; closes.len()]);
        series
    }

    #[test]
    fn same_day_advice_follows_the_band_position() {
        let mut series = series_with_bands(&[5.0, 15.0, 25.0], 10.0, 20.0);
        apply_same_day(&mut series);

        assert_eq!(series.advice(0, Column::BbAdvice), Some(Advice::Buy));
        assert_eq!(series.advice(1, Column::BbAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(2, Column::BbAdvice), Some(Advice::Sell));
        // distance below lower band is negative
        assert_relative_eq!(series.num(0, Column::BbDiffPercent), -100.0);
    }

    #[test]
    fn cross_advises_on_re_entry_only() {
        let mut series = series_with_bands(&[5.0, 15.0, 16.0, 25.0, 15.0], 10.0, 20.0);
        apply_cross(&BollingerCross::default(), &mut series);

        // day 1 re-enters after an underlower day 0
        assert_eq!(series.advice(0, Column::BbAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(1, Column::BbAdvice), Some(Advice::Buy));
        // day 2 stays within after a within day, no signal
        assert_eq!(series.advice(2, Column::BbAdvice), Some(Advice::Neutral));
        // day 3 is the excursion itself, day 4 the sell re-entry
        assert_eq!(series.advice(3, Column::BbAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(4, Column::BbAdvice), Some(Advice::Sell));
    }

    #[test]
    fn warm_up_rows_stay_undefined() {
        let closes = [5.0, 15.0];
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                PriceBar::from((date, c, c, c, c, 1.0))
            })
            .collect();
        let mut series = PriceSeries::new("TST", bars);
        series.set_column(Column::BbLower, vec![f64::NAN, 10.0]);
        series.set_column(Column::BbUpper, vec![f64::NAN, 20.0]);
        apply_same_day(&mut series);

        assert_eq!(series.text(0, Column::BbState), Some("undefined"));
        assert_eq!(series.advice(0, Column::BbAdvice), Some(Advice::Neutral));
        assert!(series.num(0, Column::BbDiffPercent).is_nan());
    }
}
