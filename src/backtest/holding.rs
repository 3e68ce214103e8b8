use std::sync::Arc;

use chrono::NaiveDate;

use crate::frame::PriceBar;
use crate::utils::random_id;

/// An open position in one ticker.
///
/// Carries a shared reference to the ticker's full price history so the
/// engine can value the position and test the stop on dates the advice
/// table no longer covers.
#[derive(Debug, Clone)]
pub struct Holding {
    id: u32,
    ticker: String,
    shares: u64,
    buy_price: f64,
    buy_date: NaiveDate,
    stop_price: f64,
    total_investment: f64,
    history: Arc<[PriceBar]>,
}

impl Holding {
    pub(super) fn new(
        ticker: impl Into<String>,
        shares: u64,
        buy_price: f64,
        buy_date: NaiveDate,
        stop_price: f64,
        total_investment: f64,
        history: Arc<[PriceBar]>,
    ) -> Self {
        Self {
            id: random_id(),
            ticker: ticker.into(),
            shares,
            buy_price,
            buy_date,
            stop_price,
            total_investment,
            history,
        }
    }

    /// Returns the holding's identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the ticker symbol.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Returns the number of shares held.
    pub fn shares(&self) -> u64 {
        self.shares
    }

    /// Returns the fill price of the entry.
    pub fn buy_price(&self) -> f64 {
        self.buy_price
    }

    /// Returns the entry date.
    pub fn buy_date(&self) -> NaiveDate {
        self.buy_date
    }

    /// Returns the stop price under which the engine exits.
    pub fn stop_price(&self) -> f64 {
        self.stop_price
    }

    /// Cash spent to open the position, fee included.
    pub fn total_investment(&self) -> f64 {
        self.total_investment
    }

    /// Book value of the position at its entry price.
    pub fn book_value(&self) -> f64 {
        self.shares as f64 * self.buy_price
    }

    /// Most recent close at or before `date`, if the history reaches back
    /// that far.
    pub fn close_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.history
            .iter()
            .rev()
            .find(|bar| bar.date() <= date)
            .map(PriceBar::close)
    }

    /// Last close of the whole history.
    pub fn last_close(&self) -> Option<f64> {
        self.history.last().map(PriceBar::close)
    }
}
