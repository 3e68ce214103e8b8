//! Tabular data model for the advice pipeline.
//!
//! A [`PriceSeries`] is one ticker's daily bars plus the derived columns the
//! indicator and strategy passes write onto it. Per-ticker series are merged
//! into a [`Frame`], the flat multi-ticker table consumed by composition and
//! by the backtest engine. Derived columns live in a closed [`Column`]
//! registry rather than free-form names, so configuration errors surface at
//! parse time.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::errors::{Error, Result};

/// One trading day of OHLCV data for a single ticker.
///
/// Owned by the fetch boundary; immutable once produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<(NaiveDate, f64, f64, f64, f64, f64)> for PriceBar {
    fn from((date, open, high, low, close, volume): (NaiveDate, f64, f64, f64, f64, f64)) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl PriceBar {
    /// Returns the trading date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// The closed advice vocabulary attached to one (ticker, date) row.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Advice {
    /// Open or add to a position.
    Buy,
    /// Exit the position.
    Sell,
    /// No signal either way.
    Neutral,
    /// Keep whatever is held.
    Hold,
}

impl Advice {
    /// Returns the lowercase wire form used by filters and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Neutral => "neutral",
            Self::Hold => "hold",
        }
    }
}

impl std::fmt::Display for Advice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry of every column a row can carry.
///
/// Price fields are served straight from the [`PriceBar`]; everything else is
/// written by an indicator or strategy pass. Unknown names fail fast with
/// [`Error::UnknownColumn`] when parsed from configuration text.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Column {
    Date,
    Ticker,
    StockIndex,
    Open,
    High,
    Low,
    Close,
    Volume,
    Rsi,
    RsiZone,
    RsiAdvice,
    RsiScore,
    BbLower,
    BbUpper,
    BbState,
    BbDiffPercent,
    BbAdvice,
    Ma20,
    Ma50,
    Ma200,
    Ma20Slope,
    Ma50Slope,
    Ma200Slope,
    VolumeMa,
    MaTrendShort,
    MaTrendLong,
    Trend,
    MaScore,
    Macd,
    MacdSignal,
    MacdHist,
    MacdHistDiff,
    MacdAdvice,
    MacdScore,
    Momentum,
    SupResWindow,
    SupResAdvice,
    DetectedClose,
    TenDaysAdvice,
    PositionDays,
    TenDaysScore,
    Phase,
    PhaseAdvice,
    MainAdvice,
    MainAdviceScore,
}

impl Column {
    /// Returns the configuration/report name of the column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Ticker => "Ticker",
            Self::StockIndex => "Stock_Index",
            Self::Open => "Open",
            Self::High => "High",
            Self::Low => "Low",
            Self::Close => "Close",
            Self::Volume => "Volume",
            Self::Rsi => "rsi",
            Self::RsiZone => "rsi_zone",
            Self::RsiAdvice => "rsi_advice",
            Self::RsiScore => "rsi_score",
            Self::BbLower => "bb_lower",
            Self::BbUpper => "bb_upper",
            Self::BbState => "bb_state",
            Self::BbDiffPercent => "bb_diff_percent",
            Self::BbAdvice => "bb_advice",
            Self::Ma20 => "ma_20",
            Self::Ma50 => "ma_50",
            Self::Ma200 => "ma_200",
            Self::Ma20Slope => "ma_20_slope",
            Self::Ma50Slope => "ma_50_slope",
            Self::Ma200Slope => "ma_200_slope",
            Self::VolumeMa => "volume_ma",
            Self::MaTrendShort => "ma_trend_short",
            Self::MaTrendLong => "ma_trend_long",
            Self::Trend => "trend",
            Self::MaScore => "ma_score",
            Self::Macd => "macd",
            Self::MacdSignal => "macd_signal",
            Self::MacdHist => "macd_hist",
            Self::MacdHistDiff => "macd_hist_diff",
            Self::MacdAdvice => "macd_advice",
            Self::MacdScore => "macd_score",
            Self::Momentum => "momentum_10",
            Self::SupResWindow => "sup_res_window",
            Self::SupResAdvice => "sup_res_advice",
            Self::DetectedClose => "detected_close",
            Self::TenDaysAdvice => "ten_days_advice",
            Self::PositionDays => "position_days",
            Self::TenDaysScore => "ten_days_score",
            Self::Phase => "phase",
            Self::PhaseAdvice => "phase_advice",
            Self::MainAdvice => "main_advice",
            Self::MainAdviceScore => "main_advice_score",
        }
    }

    /// Every column of the registry, in declaration order.
    pub const ALL: [Column; 45] = [
        Self::Date,
        Self::Ticker,
        Self::StockIndex,
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Volume,
        Self::Rsi,
        Self::RsiZone,
        Self::RsiAdvice,
        Self::RsiScore,
        Self::BbLower,
        Self::BbUpper,
        Self::BbState,
        Self::BbDiffPercent,
        Self::BbAdvice,
        Self::Ma20,
        Self::Ma50,
        Self::Ma200,
        Self::Ma20Slope,
        Self::Ma50Slope,
        Self::Ma200Slope,
        Self::VolumeMa,
        Self::MaTrendShort,
        Self::MaTrendLong,
        Self::Trend,
        Self::MaScore,
        Self::Macd,
        Self::MacdSignal,
        Self::MacdHist,
        Self::MacdHistDiff,
        Self::MacdAdvice,
        Self::MacdScore,
        Self::Momentum,
        Self::SupResWindow,
        Self::SupResAdvice,
        Self::DetectedClose,
        Self::TenDaysAdvice,
        Self::PositionDays,
        Self::TenDaysScore,
        Self::Phase,
        Self::PhaseAdvice,
        Self::MainAdvice,
        Self::MainAdviceScore,
    ];
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownColumn(s.to_string()))
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tagged value inside a row.
///
/// `Num(f64::NAN)` is the undefined marker for warm-up periods; it renders as
/// empty, never matches a filter value and sorts last.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A floating-point value; `NaN` marks it undefined.
    Num(f64),
    /// An integer count, such as elapsed or held days.
    Int(i64),
    /// A value from the advice vocabulary.
    Advice(Advice),
    /// A categorical label.
    Text(Arc<str>),
    /// A calendar date.
    Date(NaiveDate),
}

impl Cell {
    /// Builds a text cell.
    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(Arc::from(value.as_ref()))
    }

    /// Returns the numeric value of a `Num` or `Int` cell.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the advice of an `Advice` cell.
    pub fn as_advice(&self) -> Option<Advice> {
        match self {
            Self::Advice(a) => Some(*a),
            _ => None,
        }
    }

    /// Returns false for the undefined (`NaN`) marker.
    pub fn is_defined(&self) -> bool {
        match self {
            Self::Num(v) => !v.is_nan(),
            _ => true,
        }
    }

    /// Renders the cell in its filter/report wire form.
    pub fn render(&self) -> String {
        match self {
            Self::Num(v) if v.is_nan() => String::new(),
            Self::Num(v) => format!("{v}"),
            Self::Int(v) => format!("{v}"),
            Self::Advice(a) => a.as_str().to_string(),
            Self::Text(t) => t.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Date(_) => 0,
            Self::Num(_) => 1,
            Self::Int(_) => 1,
            Self::Advice(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// Total order over cells: numerics by value, text lexical, undefined last.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_defined(), other.is_defined()) {
            (false, false) => return Ordering::Equal,
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            (true, true) => {}
        }
        match (self, other) {
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Advice(a), Self::Advice(b)) => a.as_str().cmp(b.as_str()),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_num(), b.as_num()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

/// One (ticker, date) row: a price bar plus its derived cells.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    bar: PriceBar,
    cells: BTreeMap<Column, Cell>,
}

impl Row {
    /// Returns the underlying price bar.
    pub fn bar(&self) -> &PriceBar {
        &self.bar
    }

    /// Returns a derived cell, if set.
    pub fn get(&self, column: Column) -> Option<&Cell> {
        self.cells.get(&column)
    }

    /// Sets a derived cell.
    pub fn set(&mut self, column: Column, cell: Cell) {
        self.cells.insert(column, cell);
    }
}

/// A single ticker's chronological price series, augmented in place with
/// indicator and advice columns as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    ticker: Arc<str>,
    stock_index: Option<Arc<str>>,
    rows: Vec<Row>,
}

impl PriceSeries {
    /// Builds a series from a ticker symbol and its ascending daily bars.
    pub fn new(ticker: impl AsRef<str>, bars: Vec<PriceBar>) -> Self {
        let rows = bars
            .into_iter()
            .map(|bar| Row {
                bar,
                cells: BTreeMap::new(),
            })
            .collect();
        Self {
            ticker: Arc::from(ticker.as_ref()),
            stock_index: None,
            rows,
        }
    }

    /// Attaches the pass-through market-index label.
    pub fn with_stock_index(mut self, index: impl AsRef<str>) -> Self {
        self.stock_index = Some(Arc::from(index.as_ref()));
        self
    }

    /// Returns the ticker symbol.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Returns all close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.bar.close).collect()
    }

    /// Returns all traded volumes in date order.
    pub fn volumes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.bar.volume).collect()
    }

    /// Reads a numeric cell; missing or non-numeric cells read as NaN so that
    /// undefined warm-up values propagate through downstream computations.
    pub fn num(&self, index: usize, column: Column) -> f64 {
        self.rows
            .get(index)
            .and_then(|r| r.get(column))
            .and_then(Cell::as_num)
            .unwrap_or(f64::NAN)
    }

    /// Reads a text cell.
    pub fn text(&self, index: usize, column: Column) -> Option<&str> {
        match self.rows.get(index).and_then(|r| r.get(column)) {
            Some(Cell::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Reads an advice cell.
    pub fn advice(&self, index: usize, column: Column) -> Option<Advice> {
        self.rows
            .get(index)
            .and_then(|r| r.get(column))
            .and_then(Cell::as_advice)
    }

    /// Sets one cell.
    pub fn set(&mut self, index: usize, column: Column, cell: Cell) {
        if let Some(row) = self.rows.get_mut(index) {
            row.set(column, cell);
        }
    }

    /// Writes a full numeric column aligned to the series' dates.
    pub fn set_column(&mut self, column: Column, values: Vec<f64>) {
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.set(column, Cell::Num(value));
        }
    }

}

/// One row of the merged multi-ticker table.
#[derive(Debug, Clone)]
pub struct FrameRow {
    ticker: Arc<str>,
    stock_index: Option<Arc<str>>,
    row: Row,
}

impl FrameRow {
    /// Returns the ticker symbol.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Returns the trading date.
    pub fn date(&self) -> NaiveDate {
        self.row.bar.date
    }

    /// Returns the underlying price bar.
    pub fn bar(&self) -> &PriceBar {
        &self.row.bar
    }

    /// Returns the row's `main_advice`, if set.
    pub fn main_advice(&self) -> Option<Advice> {
        self.row.get(Column::MainAdvice).and_then(Cell::as_advice)
    }

    /// Looks up any registry column on this row.
    ///
    /// Price fields and the pass-through attributes are materialized from the
    /// bar; derived columns come from the strategy cells.
    pub fn cell(&self, column: Column) -> Option<Cell> {
        match column {
            Column::Date => Some(Cell::Date(self.row.bar.date)),
            Column::Ticker => Some(Cell::Text(Arc::clone(&self.ticker))),
            Column::StockIndex => self.stock_index.as_ref().map(|i| Cell::Text(Arc::clone(i))),
            Column::Open => Some(Cell::Num(self.row.bar.open)),
            Column::High => Some(Cell::Num(self.row.bar.high)),
            Column::Low => Some(Cell::Num(self.row.bar.low)),
            Column::Close => Some(Cell::Num(self.row.bar.close)),
            Column::Volume => Some(Cell::Num(self.row.bar.volume)),
            _ => self.row.get(column).cloned(),
        }
    }

    /// Sets a derived cell on this row.
    pub fn set(&mut self, column: Column, cell: Cell) {
        self.row.set(column, cell);
    }
}

/// The merged, advice-tagged, multi-ticker table.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    rows: Vec<FrameRow>,
}

impl Frame {
    /// Concatenates per-ticker series, preserving each series' internal date
    /// order and the given series order.
    pub fn from_series(series: Vec<PriceSeries>) -> Self {
        let mut rows = Vec::new();
        for s in series {
            for row in s.rows {
                rows.push(FrameRow {
                    ticker: Arc::clone(&s.ticker),
                    stock_index: s.stock_index.clone(),
                    row,
                });
            }
        }
        Self { rows }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> std::slice::Iter<'_, FrameRow> {
        self.rows.iter()
    }

    /// Returns a mutable iterator over the rows.
    pub fn rows_mut(&mut self) -> std::slice::IterMut<'_, FrameRow> {
        self.rows.iter_mut()
    }

    /// Returns true when at least one row carries the column.
    pub fn has_column(&self, column: Column) -> bool {
        self.rows.iter().any(|r| r.cell(column).is_some())
    }

    /// Keeps only the rows matching the predicate.
    pub fn retain<P>(&mut self, predicate: P)
    where
        P: FnMut(&FrameRow) -> bool,
    {
        self.rows.retain(predicate);
    }

    /// Stable-sorts the rows with the given comparator.
    pub fn sort_by<C>(&mut self, compare: C)
    where
        C: FnMut(&FrameRow, &FrameRow) -> Ordering,
    {
        self.rows.sort_by(compare);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> PriceBar {
        PriceBar::from((day(d), close, close, close, close, 1.0))
    }

    #[test]
    fn column_round_trip_names() {
        for column in Column::ALL {
            assert_eq!(Column::from_str(column.as_str()).unwrap(), column);
        }
    }

    #[test]
    fn unknown_column_is_an_error() {
        let result = Column::from_str("does_not_exist");
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn undefined_num_cells_sort_last_and_never_render() {
        let undefined = Cell::Num(f64::NAN);
        let defined = Cell::Num(1.0);
        assert_eq!(undefined.compare(&defined), Ordering::Greater);
        assert_eq!(defined.compare(&undefined), Ordering::Less);
        assert_eq!(undefined.render(), "");
        assert!(!undefined.is_defined());
    }

    #[test]
    fn series_num_reads_missing_cells_as_nan() {
        let series = PriceSeries::new("ABC", vec![bar(1, 10.0)]);
        assert!(series.num(0, Column::Rsi).is_nan());
        assert!(series.num(7, Column::Rsi).is_nan());
    }

    #[test]
    fn frame_concat_preserves_order_and_pass_through_index() {
        let a = PriceSeries::new("AAA", vec![bar(1, 10.0), bar(2, 11.0)]).with_stock_index("FTSE_100");
        let b = PriceSeries::new("BBB", vec![bar(1, 20.0)]);
        let frame = Frame::from_series(vec![a, b]);

        assert_eq!(frame.len(), 3);
        let tickers = frame.rows().map(|r| r.ticker().to_string()).collect::<Vec<_>>();
        assert_eq!(tickers, ["AAA", "AAA", "BBB"]);
        assert_eq!(
            frame.rows().next().unwrap().cell(Column::StockIndex),
            Some(Cell::text("FTSE_100"))
        );
        assert_eq!(frame.rows().last().unwrap().cell(Column::StockIndex), None);
    }
}
