//! RSI zone classification.

use crate::frame::{Advice, Cell, Column, PriceSeries};

/// Strict-bound RSI bands.
///
/// A value inside the open oversold interval reads as a buy, inside the open
/// overbought interval as a sell. The band edges themselves are neutral, as
/// is an undefined RSI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiBands {
    /// Open interval classified as oversold.
    pub oversold: (f64, f64),
    /// Open interval classified as overbought.
    pub overbought: (f64, f64),
}

impl Default for RsiBands {
    fn default() -> Self {
        Self {
            oversold: (0.0, 30.0),
            overbought: (70.0, 100.0),
        }
    }
}

impl RsiBands {
    fn zone(&self, rsi: f64) -> &'static str {
        if rsi.is_nan() {
            "undefined"
        } else if self.overbought.0 < rsi && rsi < self.overbought.1 {
            "overbought"
        } else if self.oversold.0 < rsi && rsi < self.oversold.1 {
            "oversold"
        } else {
            "neutral"
        }
    }
}

pub(super) fn apply(bands: &RsiBands, series: &mut PriceSeries) {
    for i in 0..series.len() {
        let zone = bands.zone(series.num(i, Column::Rsi));
        let advice = match zone {
            "oversold" => Advice::Buy,
            "overbought" => Advice::Sell,
            _ => Advice::Neutral,
        };
        series.set(i, Column::RsiZone, Cell::text(zone));
        series.set(i, Column::RsiAdvice, Cell::Advice(advice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PriceBar;
    use chrono::NaiveDate;

    fn series_with_rsi(values: &[f64]) -> PriceSeries {
        let bars = values
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                PriceBar::from((date, 1.0, 1.0, 1.0, 1.0, 1.0))
            })
            .collect();
        let mut series = PriceSeries::new("TST", bars);
        series.set_column(Column::Rsi, values.to_vec());
        series
    }

    #[test]
    fn bands_are_strict() {
        let mut series = series_with_rsi(&[f64::NAN, 10.0, 30.0, 50.0, 70.0, 85.0]);
        apply(&RsiBands::default(), &mut series);

        assert_eq!(series.text(0, Column::RsiZone), Some("undefined"));
        assert_eq!(series.advice(0, Column::RsiAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(1, Column::RsiAdvice), Some(Advice::Buy));
        // 30 and 70 sit on the edges and stay neutral
        assert_eq!(series.advice(2, Column::RsiAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(3, Column::RsiAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(4, Column::RsiAdvice), Some(Advice::Neutral));
        assert_eq!(series.advice(5, Column::RsiAdvice), Some(Advice::Sell));
        assert_eq!(series.text(5, Column::RsiZone), Some("overbought"));
    }
}
