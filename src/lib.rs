//! # ABT: Advice BackTester for Daily Stock Data
//!
//! **ABT** turns daily price history into buy/sell/hold advice with pluggable
//! strategies, then backtests the advice against a simulated portfolio.
//! It is designed for **end-of-day workflows**: pull a period of daily bars per
//! ticker, run indicator and strategy passes, compose the results into one
//! advice table, and walk a portfolio through it.
//!
//! ## Core Components
//! | Component   | Description                                                                    |
//! |-------------|--------------------------------------------------------------------------------|
//! | **`PriceBar`** | One trading day of OHLCV data for a single ticker.                          |
//! | **`Frame`** | The merged multi-ticker advice table, one row per (ticker, date).              |
//! | **`IndicatorSpec`** | Registry of indicator passes: RSI, MACD, Bollinger, moving averages.   |
//! | **`StrategySpec`** | Registry of strategy passes writing advice and score columns.           |
//! | **`FilterBy` / `SortBy`** | Post-run composition over the merged table.                      |
//! | **`Analysis`** | A recipe of passes; runs tickers in parallel and merges the results.        |
//! | **`Backtest`** | The engine that walks the advice table and keeps the transaction ledger.    |
//!
//! ## Strategies
//! | Name | Rule |
//! |------|------|
//! | `rsi` | Advice on strict oversold/overbought RSI bands.                               |
//! | `bb` / `bb_cross` | Bollinger band position, same-day or on re-entry.                 |
//! | `macd` | Three-day histogram turn.                                                    |
//! | `ma_trend_short` / `ma_trend_long` / `trend` | Moving-average crossovers and stack.   |
//! | `ma_score` / `macd_score` / `rsi_score` | Trend-gated scores in `[-1, 1]`.            |
//! | `sup_res` | Support/resistance level revisits.                                        |
//! | `ten_days` | Ten-day low entries, ten-day high exits.                                 |
//! | `four_ps` | Four-phase cycle classification.                                          |
//! | `main` | Weighted score fold into the final advice.                                   |
//!
//! ## Getting Started
//! ```rust
//! use abt_rs::prelude::*;
//! use chrono::NaiveDate;
//! use std::collections::HashMap;
//!
//! struct Flat;
//!
//! impl PriceProvider for Flat {
//!     fn price_series(&self, _ticker: &str, period: &DateRange) -> Result<Vec<PriceBar>> {
//!         Ok(period
//!             .days()
//!             .map(|date| PriceBar::from((date, 10.0, 10.5, 9.5, 10.0, 1_000.0)))
//!             .collect())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let today = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
//!     let period = parse_period("6mo", today)?;
//!     let tickers = vec![TickerEntry::new("ABC").with_index("FTSE_100")];
//!
//!     // weighted trend scoring across RSI, MACD and the moving averages
//!     let analyzed = trend_based().run(&Flat, &tickers, &period)?;
//!
//!     // walk a \$10,000 portfolio through the advice
//!     let config = BacktestConfig::new(10_000.0, period);
//!     let mut backtest = Backtest::new(config, analyzed.histories.clone())?;
//!     backtest.run(&analyzed.frame)?;
//!
//!     for entry in backtest.ledger() {
//!         println!("{} {} {:?}", entry.date, entry.ticker, entry.action);
//!     }
//!     for line in backtest.snapshot() {
//!         println!("{}: {:.2}", line.label, line.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Integrations
//! | Crate          | Purpose                                                  |
//! |----------------|----------------------------------------------------------|
//! | [`rayon`](https://crates.io/crates/rayon) | Parallel per-ticker analysis. |
//! | [`tracing`](https://crates.io/crates/tracing) | Structured pipeline and engine diagnostics. |
//! | [`serde`](https://crates.io/crates/serde) | Serialize bars, ledgers and snapshots (feature `serde`). |
//!
//! ## Error Handling
//! Every fallible operation returns the crate [`errors::Result`]; configuration
//! text fails fast on unknown strategy, indicator or column names, and the
//! engine rejects empty tables and non-positive starting cash.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Post-run composition: filtering and sorting of the merged table.
pub mod compose;

/// Error types for the library.
pub mod errors;

/// Tabular data model: bars, cells, rows, series and the merged frame.
pub mod frame;

/// Technical indicator kernels and the indicator registry.
pub mod indicators;

/// The analysis pipeline and its preset recipes.
pub mod pipeline;

/// Advice strategies.
pub mod strategy;

/// The portfolio backtest engine.
pub mod backtest;

/// Utility functions and helpers.
mod utils;

pub use utils::{DateRange, parse_period, random_id};

#[cfg(feature = "serde")]
pub use utils::bars_from_file;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::backtest::*;
    pub use crate::compose::*;
    pub use crate::errors::*;
    pub use crate::frame::*;
    pub use crate::indicators::IndicatorSpec;
    pub use crate::pipeline::*;
    pub use crate::strategy::*;
}

use std::ops::{Add, Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
///
/// This trait provides methods to add, subtract, and calculate percentages
/// for numeric types, enabling common financial calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Adds a percentage to the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to add (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value increased by the given percentage.
    fn addpercent(self, rhs: Rhs) -> Self;

    /// Subtracts a percentage from the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to subtract (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value decreased by the given percentage.
    fn subpercent(self, rhs: Rhs) -> Self;

    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Self) -> Self;
}

impl PercentCalculus for f64 {
    fn addpercent(self, percent: Self) -> Self {
        self.add(self.mul(percent.div(100.0)))
    }

    fn subpercent(self, percent: Self) -> Self {
        self.sub(self.mul(percent.div(100.0)))
    }

    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}

#[cfg(test)]
mod percent {
    use super::*;

    #[test]
    fn add() {
        assert_eq!(110.0, 100.0.addpercent(10.0))
    }

    #[test]
    fn sub() {
        assert_eq!(90.0, 100.0.subpercent(10.0))
    }

    #[test]
    fn change() {
        assert_eq!(10.0, 100.0.change(110.0))
    }

    #[test]
    fn stop_price_sits_seven_percent_under() {
        assert_eq!(93.0, 100.0.subpercent(7.0))
    }
}
