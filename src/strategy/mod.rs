//! Advice strategies.
//!
//! A strategy is a pass over one ticker's [`PriceSeries`] that reads price
//! and indicator columns and writes advice, state or score columns. The set
//! of strategies is a closed registry: [`StrategySpec`] enumerates every
//! family, carries its parameters, and rejects unknown names at parse time
//! with [`Error::UnknownStrategy`].
//!
//! Strategies run in the order a pipeline lists them; score passes assume
//! the columns they read were written by an earlier pass and treat missing
//! values as undefined.

mod bollinger;
mod macd;
mod moving_average;
mod phases;
mod rsi;
mod score;
mod support_resistance;
mod ten_day;

pub use bollinger::BollingerCross;
pub use phases::Phase;
pub use rsi::RsiBands;
pub use score::WeightedMainAdvice;
pub use support_resistance::SupportResistance;

use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::frame::{Column, PriceSeries};

/// Moving-average pair selector for the term trend pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaTerm {
    /// Compares the 20-day against the 50-day average.
    #[default]
    Short,
    /// Compares the 50-day against the 200-day average.
    Long,
}

/// The closed registry of strategy passes.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    /// RSI zone classification with buy/sell advice on the band edges.
    RsiBands(RsiBands),
    /// Bollinger band position with same-day advice.
    Bollinger,
    /// Bollinger band re-entry advice after an excursion N days ago.
    BollingerCross(BollingerCross),
    /// Short- or long-term moving-average crossover trend.
    MaTrendTerm(MaTerm),
    /// Three-average stack trend label (uptrend/downtrend/sideways).
    TrendDirection,
    /// MACD histogram three-day turn advice.
    MacdThreeDay,
    /// Trend-gated moving-average spread score in `[-1, 1]`.
    MaTrendScore,
    /// Trend-gated MACD crossover score in `[-1, 1]`.
    MacdTrendScore,
    /// Trend-gated RSI distance-from-midline score in `[-1, 1]`.
    RsiTrendScore,
    /// Support/resistance level revisits with elapsed-day windows.
    SupportResistance(SupportResistance),
    /// Ten-day low entries and ten-day high exits above long averages.
    TenDayLowHigh,
    /// Four-phase cycle classification with breakout advice.
    PhaseDetection,
    /// Weighted sum of score columns folded into `main_advice`.
    WeightedMainAdvice(WeightedMainAdvice),
}

impl StrategySpec {
    /// Returns the configuration name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RsiBands(_) => "rsi",
            Self::Bollinger => "bb",
            Self::BollingerCross(_) => "bb_cross",
            Self::MaTrendTerm(MaTerm::Short) => "ma_trend_short",
            Self::MaTrendTerm(MaTerm::Long) => "ma_trend_long",
            Self::TrendDirection => "trend",
            Self::MacdThreeDay => "macd",
            Self::MaTrendScore => "ma_score",
            Self::MacdTrendScore => "macd_score",
            Self::RsiTrendScore => "rsi_score",
            Self::SupportResistance(_) => "sup_res",
            Self::TenDayLowHigh => "ten_days",
            Self::PhaseDetection => "four_ps",
            Self::WeightedMainAdvice(_) => "main",
        }
    }

    /// Runs the pass over one ticker's series.
    pub fn apply(&self, series: &mut PriceSeries) -> Result<()> {
        match self {
            Self::RsiBands(bands) => rsi::apply(bands, series),
            Self::Bollinger => bollinger::apply_same_day(series),
            Self::BollingerCross(cross) => bollinger::apply_cross(cross, series),
            Self::MaTrendTerm(term) => moving_average::apply_term(*term, series),
            Self::TrendDirection => moving_average::apply_trend(series),
            Self::MacdThreeDay => macd::apply(series),
            Self::MaTrendScore => score::apply_ma(series),
            Self::MacdTrendScore => score::apply_macd(series),
            Self::RsiTrendScore => score::apply_rsi(series),
            Self::SupportResistance(params) => support_resistance::apply(params, series),
            Self::TenDayLowHigh => ten_day::apply(series),
            Self::PhaseDetection => phases::apply(series),
            Self::WeightedMainAdvice(weighted) => score::apply_weighted(weighted, series),
        }
        Ok(())
    }

    /// Column an aggregating pipeline should read this strategy's advice
    /// from, when the strategy emits one.
    pub fn advice_column(&self) -> Option<Column> {
        match self {
            Self::RsiBands(_) => Some(Column::RsiAdvice),
            Self::Bollinger | Self::BollingerCross(_) => Some(Column::BbAdvice),
            Self::MacdThreeDay => Some(Column::MacdAdvice),
            Self::SupportResistance(_) => Some(Column::SupResAdvice),
            Self::TenDayLowHigh => Some(Column::TenDaysAdvice),
            Self::PhaseDetection => Some(Column::PhaseAdvice),
            Self::WeightedMainAdvice(_) => Some(Column::MainAdvice),
            _ => None,
        }
    }
}

impl FromStr for StrategySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rsi" => Ok(Self::RsiBands(RsiBands::default())),
            "bb" => Ok(Self::Bollinger),
            "bb_cross" => Ok(Self::BollingerCross(BollingerCross::default())),
            "ma_trend_short" => Ok(Self::MaTrendTerm(MaTerm::Short)),
            "ma_trend_long" => Ok(Self::MaTrendTerm(MaTerm::Long)),
            "trend" => Ok(Self::TrendDirection),
            "macd" => Ok(Self::MacdThreeDay),
            "ma_score" => Ok(Self::MaTrendScore),
            "macd_score" => Ok(Self::MacdTrendScore),
            "rsi_score" => Ok(Self::RsiTrendScore),
            "sup_res" => Ok(Self::SupportResistance(SupportResistance::default())),
            "ten_days" => Ok(Self::TenDayLowHigh),
            "four_ps" => Ok(Self::PhaseDetection),
            "main" => Ok(Self::WeightedMainAdvice(WeightedMainAdvice::default())),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_round_trip() {
        for name in [
            "rsi", "bb", "bb_cross", "ma_trend_short", "ma_trend_long", "trend", "macd",
            "ma_score", "macd_score", "rsi_score", "sup_res", "ten_days", "four_ps", "main",
        ] {
            let spec: StrategySpec = name.parse().unwrap();
            assert_eq!(spec.name(), name);
        }
    }

    #[test]
    fn unknown_strategy_fails_fast() {
        assert!(matches!(
            "turtle".parse::<StrategySpec>(),
            Err(Error::UnknownStrategy(_))
        ));
    }
}
