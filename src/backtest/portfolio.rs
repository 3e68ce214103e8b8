use crate::backtest::holding::Holding;
use crate::errors::{Error, Result};

/// Cash plus open holdings.
///
/// The portfolio never goes negative: every mutation that spends cash checks
/// the balance first and the engine sizes buys so the fee is always covered.
#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_cash: f64,
    cash: f64,
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub(super) fn new(initial_cash: f64) -> Result<Self> {
        if initial_cash <= 0.0 || !initial_cash.is_finite() {
            return Err(Error::NegZeroCash(initial_cash));
        }
        Ok(Self {
            initial_cash,
            cash: initial_cash,
            holdings: Vec::new(),
        })
    }

    /// Returns the cash the portfolio started with.
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Returns the current cash balance.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the open holdings.
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Returns true when a holding in `ticker` is open.
    pub fn is_open(&self, ticker: &str) -> bool {
        self.holdings.iter().any(|h| h.ticker() == ticker)
    }

    /// Book value of all holdings plus cash, positions at entry price.
    pub fn total_value(&self) -> f64 {
        self.cash + self.holdings.iter().map(Holding::book_value).sum::<f64>()
    }

    pub(super) fn deposit(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub(super) fn withdraw(&mut self, amount: f64) -> Result<()> {
        if amount > self.cash {
            return Err(Error::NegZeroCash(self.cash - amount));
        }
        self.cash -= amount;
        Ok(())
    }

    pub(super) fn push_holding(&mut self, holding: Holding) {
        self.holdings.push(holding);
    }

    pub(super) fn take_holding(&mut self, id: u32) -> Result<Holding> {
        let index = self
            .holdings
            .iter()
            .position(|h| h.id() == id)
            .ok_or(Error::HoldingNotFound)?;
        Ok(self.holdings.remove(index))
    }

    pub(super) fn reset(&mut self) {
        self.cash = self.initial_cash;
        self.holdings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_initial_cash() {
        assert!(matches!(Portfolio::new(0.0), Err(Error::NegZeroCash(_))));
        assert!(matches!(Portfolio::new(-5.0), Err(Error::NegZeroCash(_))));
        assert!(Portfolio::new(1000.0).is_ok());
    }

    #[test]
    fn withdraw_never_overdraws() {
        let mut p = Portfolio::new(100.0).unwrap();
        assert!(p.withdraw(150.0).is_err());
        assert_eq!(p.cash(), 100.0);
        p.withdraw(40.0).unwrap();
        assert_eq!(p.cash(), 60.0);
    }
}
