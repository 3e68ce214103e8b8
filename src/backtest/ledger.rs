use chrono::NaiveDate;

/// What a ledger line records.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    /// Entry fill.
    Buy,
    /// Exit on a sell advice.
    SellSignal,
    /// Exit forced by the stop price.
    SellStopLoss,
}

impl TransactionAction {
    /// Returns the report label of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::SellSignal => "sell_signal",
            Self::SellStopLoss => "sell_stop_loss",
        }
    }
}

/// One executed transaction with the portfolio state after it.
///
/// `amount` is signed: negative for the cash spent on a buy (fill plus fee),
/// positive for the net proceeds of a sell. `total_value` books open
/// positions at their entry price, so it moves only when cash does.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLogEntry {
    /// Execution date.
    pub date: NaiveDate,
    /// Ticker the transaction traded.
    pub ticker: String,
    /// What happened.
    pub action: TransactionAction,
    /// Shares filled.
    pub shares: u64,
    /// Fill price per share.
    pub price: f64,
    /// Signed cash delta, fee included.
    pub amount: f64,
    /// Cash balance after the transaction.
    pub cash: f64,
    /// Cash plus open positions at their entry price.
    pub total_value: f64,
    /// `total_value` minus the starting cash.
    pub yield_amount: f64,
    /// Percentage return over the starting cash.
    pub yield_percent: f64,
}

/// One line of a portfolio snapshot: a funded position, the cash line or the
/// closing total.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    /// Ticker symbol, `CASH` or `TOTAL`.
    pub label: String,
    /// Shares held; zero on the cash and total lines.
    pub shares: u64,
    /// Valuation price per share, the most recent known close.
    pub price: f64,
    /// Market value of the line.
    pub value: f64,
}

impl SnapshotRow {
    /// Label of the cash line.
    pub const CASH: &'static str = "CASH";
    /// Label of the closing total line.
    pub const TOTAL: &'static str = "TOTAL";
}
