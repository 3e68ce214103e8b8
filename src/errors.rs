/// Alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong, from configuration parsing to the engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The merged advice table is empty. Backtesting requires at least one row.
    #[error("Advice table is empty: backtesting requires at least one row")]
    EmptyFrame,

    /// Required columns are absent from the advice table.
    /// Checked before any simulation starts.
    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    /// The initial or current cash balance is not positive.
    #[error("Cash balance must be positive (got: {0})")]
    NegZeroCash(f64),

    /// The strategy name is not part of the registry.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// The indicator name is not part of the registry.
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    /// A filter or sort expression names a column outside the registry.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A filter expression could not be parsed.
    #[error("Malformed filter expression: {0}")]
    MalformedFilter(String),

    /// The backtest period string could not be parsed.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// The holding was not found in the portfolio.
    #[error("Holding not found")]
    HoldingNotFound,

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
