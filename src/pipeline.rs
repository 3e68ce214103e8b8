//! Analysis pipeline: fetch, per-ticker passes, merge, composition.
//!
//! An [`Analysis`] lists indicator passes, strategy passes and post-run
//! composition steps. [`Analysis::run`] pulls each ticker's history from a
//! [`PriceProvider`], runs the per-ticker passes in parallel, concatenates
//! the series into one [`Frame`] in ticker order, then applies composition
//! sequentially. Tickers without data are skipped with a warning; a run
//! whose every ticker came back empty is an [`Error::EmptyFrame`].

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::compose::{FilterBy, SortBy};
use crate::errors::{Error, Result};
use crate::frame::{Advice, Cell, Column, Frame, PriceBar, PriceSeries};
use crate::indicators::IndicatorSpec;
use crate::strategy::{
    BollingerCross, MaTerm, RsiBands, StrategySpec, SupportResistance, WeightedMainAdvice,
};
use crate::utils::DateRange;

/// Source of daily price history.
///
/// Implementations return bars in ascending date order, already clipped to
/// the requested period. An empty vector means the provider has no data for
/// the ticker; that is not an error.
pub trait PriceProvider {
    /// Fetches the daily bars of `ticker` over `period`.
    fn price_series(&self, ticker: &str, period: &DateRange) -> Result<Vec<PriceBar>>;
}

/// One ticker to analyze, with its optional market-index label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerEntry {
    /// Ticker symbol as the provider knows it.
    pub symbol: String,
    /// Pass-through index label carried onto every row.
    pub stock_index: Option<String>,
}

impl TickerEntry {
    /// Builds an entry without an index label.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            stock_index: None,
        }
    }

    /// Attaches the index label.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.stock_index = Some(index.into());
        self
    }
}

/// A post-run composition step over the merged table.
#[derive(Debug, Clone, PartialEq)]
pub enum PostRun {
    /// Row filtering.
    Filter(FilterBy),
    /// Stable multi-key sorting.
    Sort(SortBy),
}

/// The output of a run: the composed table plus each ticker's full,
/// unfiltered history for later valuation.
#[derive(Debug, Clone)]
pub struct Analyzed {
    /// The merged, composed advice table.
    pub frame: Frame,
    /// Full per-ticker histories, untouched by composition.
    pub histories: HashMap<String, Arc<[PriceBar]>>,
}

/// An ordered analysis recipe.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    indicators: Vec<IndicatorSpec>,
    strategies: Vec<StrategySpec>,
    post_run: Vec<PostRun>,
    main_advice: Option<Column>,
}

impl Analysis {
    /// Starts an empty recipe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an indicator pass.
    pub fn indicator(mut self, spec: IndicatorSpec) -> Self {
        self.indicators.push(spec);
        self
    }

    /// Appends a strategy pass.
    pub fn strategy(mut self, spec: StrategySpec) -> Self {
        self.strategies.push(spec);
        self
    }

    /// Appends a post-run composition step.
    pub fn post_run(mut self, step: PostRun) -> Self {
        self.post_run.push(step);
        self
    }

    /// Marks `column` as the advice the backtest engine should follow; its
    /// values are copied into `main_advice` after composition. Rows where
    /// the column is absent read as hold.
    pub fn main_advice(mut self, column: Column) -> Self {
        self.main_advice = Some(column);
        self
    }

    /// Runs the recipe over `tickers`.
    pub fn run<P>(&self, provider: &P, tickers: &[TickerEntry], period: &DateRange) -> Result<Analyzed>
    where
        P: PriceProvider + Sync,
    {
        info!(
            tickers = tickers.len(),
            indicators = self.indicators.len(),
            strategies = self.strategies.len(),
            "running analysis"
        );
        let series: Vec<Option<(PriceSeries, Arc<[PriceBar]>)>> = tickers
            .par_iter()
            .map(|entry| self.run_ticker(provider, entry, period))
            .collect::<Result<_>>()?;

        let mut histories = HashMap::new();
        let mut merged = Vec::new();
        for (series, bars) in series.into_iter().flatten() {
            histories.insert(series.ticker().to_string(), bars);
            merged.push(series);
        }
        let mut frame = Frame::from_series(merged);
        if frame.is_empty() {
            return Err(Error::EmptyFrame);
        }

        for step in &self.post_run {
            match step {
                PostRun::Filter(filter) => filter.apply(&mut frame),
                PostRun::Sort(sort) => sort.apply(&mut frame),
            }
        }

        if let Some(source) = self.main_advice {
            for row in frame.rows_mut() {
                let advice = row
                    .cell(source)
                    .and_then(|c| c.as_advice())
                    .unwrap_or(Advice::Hold);
                row.set(Column::MainAdvice, Cell::Advice(advice));
            }
        }
        Ok(Analyzed { frame, histories })
    }

    fn run_ticker<P>(
        &self,
        provider: &P,
        entry: &TickerEntry,
        period: &DateRange,
    ) -> Result<Option<(PriceSeries, Arc<[PriceBar]>)>>
    where
        P: PriceProvider + Sync,
    {
        let bars = provider.price_series(&entry.symbol, period)?;
        if bars.is_empty() {
            warn!(ticker = entry.symbol.as_str(), "no data for ticker, skipping");
            return Ok(None);
        }
        let history: Arc<[PriceBar]> = Arc::from(bars.as_slice());
        let mut series = PriceSeries::new(&entry.symbol, bars);
        if let Some(index) = &entry.stock_index {
            series = series.with_stock_index(index);
        }
        for indicator in &self.indicators {
            indicator.apply(&mut series)?;
        }
        for strategy in &self.strategies {
            strategy.apply(&mut series)?;
        }
        Ok(Some((series, history)))
    }
}

/// Bollinger re-entry advice with widened RSI bands and the short-term
/// moving-average trend alongside, for composing over all three columns.
pub fn bb_rsi() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Rsi(14))
        .indicator(IndicatorSpec::Bollinger)
        .indicator(IndicatorSpec::Sma(20))
        .indicator(IndicatorSpec::Sma(50))
        .strategy(StrategySpec::RsiBands(RsiBands {
            oversold: (20.0, 35.0),
            overbought: (65.0, 100.0),
        }))
        .strategy(StrategySpec::BollingerCross(BollingerCross::default()))
        .strategy(StrategySpec::MaTrendTerm(MaTerm::Short))
        .main_advice(Column::BbAdvice)
}

/// MACD three-day turn advice with the RSI zones alongside.
pub fn macd_rsi() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Rsi(14))
        .indicator(IndicatorSpec::Macd)
        .strategy(StrategySpec::RsiBands(RsiBands::default()))
        .strategy(StrategySpec::MacdThreeDay)
        .main_advice(Column::MacdAdvice)
}

/// Trend-gated weighted scoring across RSI, MACD and the moving averages.
pub fn trend_based() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Rsi(14))
        .indicator(IndicatorSpec::Macd)
        .indicator(IndicatorSpec::Sma(20))
        .indicator(IndicatorSpec::Sma(50))
        .indicator(IndicatorSpec::Sma(200))
        .strategy(StrategySpec::TrendDirection)
        .strategy(StrategySpec::RsiTrendScore)
        .strategy(StrategySpec::MacdTrendScore)
        .strategy(StrategySpec::MaTrendScore)
        .strategy(StrategySpec::WeightedMainAdvice(WeightedMainAdvice::default()))
}

/// Four-phase cycle detection over the full indicator set.
pub fn four_ps() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Sma(50))
        .indicator(IndicatorSpec::Sma(200))
        .indicator(IndicatorSpec::SmaSlope(50))
        .indicator(IndicatorSpec::SmaSlope(200))
        .indicator(IndicatorSpec::Bollinger)
        .indicator(IndicatorSpec::Macd)
        .indicator(IndicatorSpec::Momentum(10))
        .strategy(StrategySpec::PhaseDetection)
        .main_advice(Column::PhaseAdvice)
}

/// Ten-day low/high position cycling above the long averages.
pub fn ten_days() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Sma(50))
        .indicator(IndicatorSpec::Sma(200))
        .strategy(StrategySpec::TenDayLowHigh)
        .main_advice(Column::TenDaysAdvice)
}

/// Support/resistance revisit signals.
pub fn sup_res() -> Analysis {
    Analysis::new()
        .strategy(StrategySpec::SupportResistance(SupportResistance::default()))
        .main_advice(Column::SupResAdvice)
}

/// Short- and long-term moving-average crossovers with the stack trend.
pub fn ma_trends() -> Analysis {
    Analysis::new()
        .indicator(IndicatorSpec::Sma(20))
        .indicator(IndicatorSpec::Sma(50))
        .indicator(IndicatorSpec::Sma(200))
        .strategy(StrategySpec::MaTrendTerm(MaTerm::Short))
        .strategy(StrategySpec::MaTrendTerm(MaTerm::Long))
        .strategy(StrategySpec::TrendDirection)
        .main_advice(Column::MaTrendShort)
}
