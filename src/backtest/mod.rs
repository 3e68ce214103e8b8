//! Portfolio backtest over an advice table.
//!
//! The engine walks every calendar date of the configured period, weekends
//! and data gaps included. Each date's rows run in table order, and every
//! row settles its own ticker's exit before its entry: a sell advice wins
//! over the stop, and the stop is tested against the most recent known
//! close, so positions also exit on dates the advice table does not cover.
//! Entries follow a fixed-allocation sizing rule with a flat fee on both
//! sides, and positions are booked at their entry price until sold.

mod holding;
mod ledger;
mod portfolio;
#[cfg(test)]
mod sim;

pub use holding::Holding;
pub use ledger::{SnapshotRow, TransactionAction, TransactionLogEntry};
pub use portfolio::Portfolio;

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::PercentCalculus;
use crate::errors::{Error, Result};
use crate::frame::{Advice, Column, Frame, FrameRow, PriceBar};
use crate::utils::DateRange;

/// Default flat transaction fee, charged on both sides.
pub const DEFAULT_FEE: f64 = 11.95;
/// Default cash allocated per entry.
pub const DEFAULT_ALLOCATION: f64 = 3000.0;
/// Default cash floor below which no entry opens.
pub const DEFAULT_MIN_CASH: f64 = 1000.0;
/// Default stop distance below the entry price, in percent.
pub const DEFAULT_STOP_LOSS_PERCENT: f64 = 7.0;

/// Engine parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    /// Cash the portfolio starts with.
    pub initial_cash: f64,
    /// Cash allocated to one entry, fee included.
    pub allocation: f64,
    /// No entry opens once cash sits below this floor.
    pub min_cash: f64,
    /// Flat fee per transaction.
    pub fee: f64,
    /// Stop distance below the entry price, in percent.
    pub stop_loss_percent: f64,
    /// Calendar period the simulation walks.
    pub period: DateRange,
}

impl BacktestConfig {
    /// Builds a config with the default fee, sizing and stop parameters.
    pub fn new(initial_cash: f64, period: DateRange) -> Self {
        Self {
            initial_cash,
            allocation: DEFAULT_ALLOCATION,
            min_cash: DEFAULT_MIN_CASH,
            fee: DEFAULT_FEE,
            stop_loss_percent: DEFAULT_STOP_LOSS_PERCENT,
            period,
        }
    }
}

/// The backtest engine: a portfolio, the per-ticker histories and the
/// transaction ledger of everything executed so far.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    portfolio: Portfolio,
    histories: HashMap<String, Arc<[PriceBar]>>,
    ledger: Vec<TransactionLogEntry>,
}

impl Deref for Backtest {
    type Target = Portfolio;

    fn deref(&self) -> &Self::Target {
        &self.portfolio
    }
}

impl Backtest {
    /// Builds an engine over the given histories.
    ///
    /// Fails with [`Error::NegZeroCash`] when the configured starting cash
    /// is not a positive finite amount.
    pub fn new(config: BacktestConfig, histories: HashMap<String, Arc<[PriceBar]>>) -> Result<Self> {
        let portfolio = Portfolio::new(config.initial_cash)?;
        Ok(Self {
            config,
            portfolio,
            histories,
            ledger: Vec::new(),
        })
    }

    /// Returns the engine parameters.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns every transaction executed so far, in order.
    pub fn ledger(&self) -> &[TransactionLogEntry] {
        &self.ledger
    }

    /// Walks the period and executes the table's advice.
    pub fn run(&mut self, frame: &Frame) -> Result<()> {
        if frame.is_empty() {
            return Err(Error::EmptyFrame);
        }
        if !frame.rows().all(|r| r.main_advice().is_some()) {
            return Err(Error::MissingColumns(Column::MainAdvice.as_str().into()));
        }

        let mut by_date: HashMap<NaiveDate, Vec<&FrameRow>> = HashMap::new();
        for row in frame.rows() {
            by_date.entry(row.date()).or_default().push(row);
        }

        info!(
            start = %self.config.period.start(),
            end = %self.config.period.end(),
            rows = frame.len(),
            "starting backtest"
        );
        for date in self.config.period.days() {
            let rows = by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            self.step(date, rows)?;
        }
        Ok(())
    }

    /// Portfolio snapshot: every open position at its most recent known
    /// close, then the cash line, then the total.
    pub fn snapshot(&self) -> Vec<SnapshotRow> {
        let as_of = self.config.period.end();
        let mut rows = Vec::with_capacity(self.portfolio.holdings().len() + 2);
        let mut total = 0.0;
        for holding in self.portfolio.holdings() {
            let price = holding
                .close_on_or_before(as_of)
                .or_else(|| holding.last_close())
                .unwrap_or_else(|| holding.buy_price());
            let value = holding.shares() as f64 * price;
            total += value;
            rows.push(SnapshotRow {
                label: holding.ticker().to_string(),
                shares: holding.shares(),
                price,
                value,
            });
        }
        rows.push(SnapshotRow {
            label: SnapshotRow::CASH.to_string(),
            shares: 0,
            price: f64::NAN,
            value: self.portfolio.cash(),
        });
        rows.push(SnapshotRow {
            label: SnapshotRow::TOTAL.to_string(),
            shares: 0,
            price: f64::NAN,
            value: total + self.portfolio.cash(),
        });
        rows
    }

    /// Returns the portfolio to its starting cash and clears the ledger.
    pub fn reset(&mut self) {
        self.portfolio.reset();
        self.ledger.clear();
    }

    /// One calendar date: holdings with no row today are swept for stops,
    /// then the date's rows run in table order, each row settling its own
    /// ticker's exit before its entry.
    fn step(&mut self, date: NaiveDate, rows: &[&FrameRow]) -> Result<()> {
        let mut stops = Vec::new();
        for holding in self.portfolio.holdings() {
            if rows.iter().any(|r| r.ticker() == holding.ticker()) {
                continue;
            }
            if let Some(close) = holding.close_on_or_before(date) {
                if close <= holding.stop_price() {
                    stops.push((holding.id(), close));
                }
            }
        }
        for (id, price) in stops {
            self.sell(id, date, price, TransactionAction::SellStopLoss)?;
        }
        for row in rows {
            self.sell_row(row, date)?;
            self.buy_row(row, date)?;
        }
        Ok(())
    }

    /// The row's own sell advice wins over the stop; the stop is the elif
    /// fallback, tested against the latest known close.
    fn sell_row(&mut self, row: &FrameRow, date: NaiveDate) -> Result<()> {
        let Some(holding) = self
            .portfolio
            .holdings()
            .iter()
            .find(|h| h.ticker() == row.ticker())
        else {
            return Ok(());
        };
        let exit = if row.main_advice() == Some(Advice::Sell) {
            Some((holding.id(), row.bar().close(), TransactionAction::SellSignal))
        } else {
            holding
                .close_on_or_before(date)
                .filter(|close| *close <= holding.stop_price())
                .map(|close| (holding.id(), close, TransactionAction::SellStopLoss))
        };
        if let Some((id, price, action)) = exit {
            self.sell(id, date, price, action)?;
        }
        Ok(())
    }

    fn buy_row(&mut self, row: &FrameRow, date: NaiveDate) -> Result<()> {
        if row.main_advice() != Some(Advice::Buy) {
            return Ok(());
        }
        if self.portfolio.is_open(row.ticker()) {
            return Ok(());
        }
        if self.portfolio.cash() < self.config.min_cash {
            debug!(ticker = row.ticker(), "cash floor reached, no entry");
            return Ok(());
        }
        self.buy(row, date)
    }

    fn buy(&mut self, row: &FrameRow, date: NaiveDate) -> Result<()> {
        let price = row.bar().close();
        let budget = self.config.allocation.min(self.portfolio.cash()) - self.config.fee;
        if price <= 0.0 || budget <= 0.0 {
            return Ok(());
        }
        let shares = (budget / price).floor() as u64;
        if shares == 0 {
            return Ok(());
        }
        let cost = shares as f64 * price + self.config.fee;
        self.portfolio.withdraw(cost)?;

        let ticker = row.ticker();
        let history = self
            .histories
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| Arc::from(vec![*row.bar()]));
        let stop_price = price.subpercent(self.config.stop_loss_percent);
        debug!(ticker, shares, price, stop_price, "entry");
        self.portfolio.push_holding(Holding::new(
            ticker, shares, price, date, stop_price, cost, history,
        ));
        self.log(date, ticker, TransactionAction::Buy, shares, price, -cost);
        Ok(())
    }

    fn sell(&mut self, id: u32, date: NaiveDate, price: f64, action: TransactionAction) -> Result<()> {
        let holding = self.portfolio.take_holding(id)?;
        // a sale never costs money: the fee caps at the sale value
        let proceeds = (holding.shares() as f64 * price - self.config.fee).max(0.0);
        self.portfolio.deposit(proceeds);
        debug!(
            ticker = holding.ticker(),
            shares = holding.shares(),
            price,
            action = action.as_str(),
            "exit"
        );
        self.log(date, holding.ticker(), action, holding.shares(), price, proceeds);
        Ok(())
    }

    fn log(
        &mut self,
        date: NaiveDate,
        ticker: &str,
        action: TransactionAction,
        shares: u64,
        price: f64,
        amount: f64,
    ) {
        let total_value = self.portfolio.total_value();
        let initial = self.portfolio.initial_cash();
        self.ledger.push(TransactionLogEntry {
            date,
            ticker: ticker.to_string(),
            action,
            shares,
            price,
            amount,
            cash: self.portfolio.cash(),
            total_value,
            yield_amount: total_value - initial,
            yield_percent: initial.change(total_value),
        });
    }
}
