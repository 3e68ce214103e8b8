//! End-to-end engine scenarios over hand-built advice tables.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;

use super::*;
use crate::frame::{Advice, Cell, Column, Frame, PriceBar, PriceSeries};
use crate::indicators;
use crate::utils::DateRange;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

/// Builds a one-ticker advice table plus its history entry.
fn ticker_table(
    ticker: &str,
    rows: &[(NaiveDate, f64, Advice)],
) -> (PriceSeries, (String, Arc<[PriceBar]>)) {
    let bars: Vec<PriceBar> = rows
        .iter()
        .map(|&(date, close, _)| PriceBar::from((date, close, close, close, close, 1.0)))
        .collect();
    let history: Arc<[PriceBar]> = Arc::from(bars.as_slice());
    let mut series = PriceSeries::new(ticker, bars);
    for (i, &(_, _, advice)) in rows.iter().enumerate() {
        series.set(i, Column::MainAdvice, Cell::Advice(advice));
    }
    (series, (ticker.to_string(), history))
}

fn engine(
    initial_cash: f64,
    period: DateRange,
    tables: Vec<(PriceSeries, (String, Arc<[PriceBar]>))>,
) -> (Backtest, Frame) {
    let mut histories = HashMap::new();
    let mut series = Vec::new();
    for (s, (ticker, bars)) in tables {
        histories.insert(ticker, bars);
        series.push(s);
    }
    let frame = Frame::from_series(series);
    let config = BacktestConfig::new(initial_cash, period);
    (Backtest::new(config, histories).unwrap(), frame)
}

#[test]
fn empty_table_is_rejected() {
    let config = BacktestConfig::new(10_000.0, DateRange::new(day(1), day(5)));
    let mut bt = Backtest::new(config, HashMap::new()).unwrap();
    assert!(matches!(bt.run(&Frame::default()), Err(crate::errors::Error::EmptyFrame)));
}

#[test]
fn missing_advice_column_is_rejected_before_simulation() {
    let bars = vec![PriceBar::from((day(1), 10.0, 10.0, 10.0, 10.0, 1.0))];
    let frame = Frame::from_series(vec![PriceSeries::new("AAA", bars)]);
    let config = BacktestConfig::new(10_000.0, DateRange::new(day(1), day(5)));
    let mut bt = Backtest::new(config, HashMap::new()).unwrap();
    let result = bt.run(&frame);
    assert!(matches!(result, Err(crate::errors::Error::MissingColumns(_))));
    assert!(bt.ledger().is_empty());
}

/// A perfectly flat series advises nothing and the portfolio never moves.
#[test]
fn flat_series_never_trades() {
    let closes = vec![42.0; 40];
    let rsi = indicators::rsi(&closes, 14);
    assert!(rsi[14..].iter().all(|&v| v == 50.0));

    let rows: Vec<_> = (0..40u32)
        .map(|i| (day(1) + chrono::Days::new(i as u64), 42.0, Advice::Neutral))
        .collect();
    let (series, entry) = ticker_table("FLAT", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(31)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    assert!(bt.ledger().is_empty());
    assert_eq!(bt.cash(), 10_000.0);
    assert_eq!(bt.total_value(), 10_000.0);
}

#[test]
fn buy_sizing_fee_and_yield_arithmetic() {
    let rows = [
        (day(1), 100.0, Advice::Buy),
        (day(2), 105.0, Advice::Hold),
        (day(3), 110.0, Advice::Sell),
    ];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(3)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    // floor((min(3000, 10000) - 11.95) / 100) = 29 shares
    let buy = &bt.ledger()[0];
    assert_eq!(buy.action, TransactionAction::Buy);
    assert_eq!(buy.shares, 29);
    assert_eq!(buy.price, 100.0);
    assert_eq!(buy.amount, -(29.0 * 100.0 + 11.95));
    assert!((buy.cash - (10_000.0 - 2_911.95)).abs() < 1e-9);
    // positions book at entry price, so total value only drops by the fee
    assert!((buy.total_value - (10_000.0 - 11.95)).abs() < 1e-9);

    let sell = &bt.ledger()[1];
    assert_eq!(sell.action, TransactionAction::SellSignal);
    assert_eq!(sell.date, day(3));
    assert_eq!(sell.amount, 29.0 * 110.0 - 11.95);
    let expected_total = 10_000.0 - 11.95 + 29.0 * 10.0 - 11.95;
    assert!((sell.total_value - expected_total).abs() < 1e-9);
    assert!((sell.yield_amount - (expected_total - 10_000.0)).abs() < 1e-9);
    assert!(
        (sell.yield_percent - (expected_total - 10_000.0) / 10_000.0 * 100.0).abs() < 1e-9
    );
    assert!(bt.holdings().is_empty());
}

#[test]
fn stop_loss_fires_at_seven_percent_without_an_advice_row() {
    // table covers the first day only; the crash lives in the history
    let rows = [(day(1), 100.0, Advice::Buy)];
    let (series, (ticker, _)) = ticker_table("AAA", &rows);
    let bars: Arc<[PriceBar]> = Arc::from(
        vec![
            PriceBar::from((day(1), 100.0, 100.0, 100.0, 100.0, 1.0)),
            PriceBar::from((day(4), 92.0, 92.0, 92.0, 92.0, 1.0)),
        ]
        .as_slice(),
    );
    let (mut bt, frame) = engine(
        10_000.0,
        DateRange::new(day(1), day(10)),
        vec![(series, (ticker, bars))],
    );
    bt.run(&frame).unwrap();

    assert_eq!(bt.ledger().len(), 2);
    let stop = &bt.ledger()[1];
    assert_eq!(stop.action, TransactionAction::SellStopLoss);
    // days 2 and 3 substitute the day-1 close (100 > 93), day 4 trips the stop
    assert_eq!(stop.date, day(4));
    assert_eq!(stop.price, 92.0);
    assert!(bt.holdings().is_empty());
}

#[test]
fn close_at_the_stop_price_exactly_still_exits() {
    let rows = [(day(1), 100.0, Advice::Buy), (day(2), 93.0, Advice::Hold)];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(2)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    assert_eq!(bt.ledger()[1].action, TransactionAction::SellStopLoss);
    assert_eq!(bt.ledger()[1].price, 93.0);
}

#[test]
fn sell_advice_wins_over_the_stop_on_the_same_day() {
    let rows = [(day(1), 100.0, Advice::Buy), (day(2), 80.0, Advice::Sell)];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(2)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    assert_eq!(bt.ledger()[1].action, TransactionAction::SellSignal);
}

#[test]
fn same_day_sell_funds_the_buy() {
    // almost all cash is locked in AAA; the BBB entry only fits after the
    // AAA exit lands earlier in the same step
    let aaa = [
        (day(1), 950.0, Advice::Buy),
        (day(2), 950.0, Advice::Sell),
    ];
    let bbb = [(day(1), 10.0, Advice::Hold), (day(2), 10.0, Advice::Buy)];
    let (s1, e1) = ticker_table("AAA", &aaa);
    let (s2, e2) = ticker_table("BBB", &bbb);
    let (mut bt, frame) = engine(1_100.0, DateRange::new(day(1), day(2)), vec![(s1, e1), (s2, e2)]);
    bt.run(&frame).unwrap();

    let actions: Vec<_> = bt.ledger().iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        [
            TransactionAction::Buy,
            TransactionAction::SellSignal,
            TransactionAction::Buy
        ]
    );
    assert_eq!(bt.ledger()[2].ticker, "BBB");
}

#[test]
fn buy_row_before_the_funding_sell_stays_skipped() {
    // BBB's buy row comes first in table order; at that point cash still
    // sits under the floor, so the AAA exit later in the day cannot fund it
    let bbb = [(day(1), 10.0, Advice::Hold), (day(2), 10.0, Advice::Buy)];
    let aaa = [
        (day(1), 950.0, Advice::Buy),
        (day(2), 950.0, Advice::Sell),
    ];
    let (s1, e1) = ticker_table("BBB", &bbb);
    let (s2, e2) = ticker_table("AAA", &aaa);
    let (mut bt, frame) = engine(1_100.0, DateRange::new(day(1), day(2)), vec![(s1, e1), (s2, e2)]);
    bt.run(&frame).unwrap();

    let entries: Vec<_> = bt.ledger().iter().map(|e| (e.ticker.as_str(), e.action)).collect();
    assert_eq!(
        entries,
        [
            ("AAA", TransactionAction::Buy),
            ("AAA", TransactionAction::SellSignal)
        ]
    );
}

#[test]
fn sell_without_a_holding_is_a_silent_no_op() {
    let aaa = [(day(1), 100.0, Advice::Buy)];
    let bbb = [(day(1), 50.0, Advice::Sell)];
    let (s1, e1) = ticker_table("AAA", &aaa);
    let (s2, e2) = ticker_table("BBB", &bbb);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(1)), vec![(s1, e1), (s2, e2)]);
    bt.run(&frame).unwrap();

    // nothing was held in BBB, so only the AAA entry is logged
    assert_eq!(bt.ledger().len(), 1);
    assert_eq!(bt.ledger()[0].ticker, "AAA");
    assert_eq!(bt.ledger()[0].shares, 29);
    assert_eq!(bt.holdings().len(), 1);
    assert_eq!(bt.holdings()[0].total_investment(), 29.0 * 100.0 + 11.95);
}

#[test]
fn no_entry_below_the_cash_floor() {
    let rows = [(day(1), 10.0, Advice::Buy)];
    let (series, entry) = ticker_table("AAA", &rows);
    let period = DateRange::new(day(1), day(1));
    let mut histories = HashMap::new();
    histories.insert(entry.0.clone(), entry.1.clone());
    let mut config = BacktestConfig::new(999.0, period);
    config.min_cash = 1_000.0;
    let mut bt = Backtest::new(config, histories).unwrap();
    bt.run(&Frame::from_series(vec![series])).unwrap();
    assert!(bt.ledger().is_empty());
}

#[test]
fn one_position_per_ticker() {
    let rows = [
        (day(1), 100.0, Advice::Buy),
        (day(2), 100.0, Advice::Buy),
        (day(3), 100.0, Advice::Buy),
    ];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(100_000.0, DateRange::new(day(1), day(3)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    assert_eq!(bt.ledger().len(), 1);
    assert_eq!(bt.holdings().len(), 1);
}

#[test]
fn snapshot_marks_to_the_latest_close_and_totals() {
    let rows = [(day(1), 100.0, Advice::Buy), (day(2), 120.0, Advice::Hold)];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(2)), vec![(series, entry)]);
    bt.run(&frame).unwrap();

    let snapshot = bt.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].label, "AAA");
    assert_eq!(snapshot[0].shares, 29);
    assert_eq!(snapshot[0].price, 120.0);
    assert_eq!(snapshot[0].value, 29.0 * 120.0);
    assert_eq!(snapshot[1].label, SnapshotRow::CASH);
    assert_eq!(snapshot[1].value, bt.cash());
    assert_eq!(snapshot[2].label, SnapshotRow::TOTAL);
    assert!((snapshot[2].value - (29.0 * 120.0 + bt.cash())).abs() < 1e-9);
}

#[test]
fn reset_restores_the_starting_state() {
    let rows = [(day(1), 100.0, Advice::Buy)];
    let (series, entry) = ticker_table("AAA", &rows);
    let (mut bt, frame) = engine(10_000.0, DateRange::new(day(1), day(1)), vec![(series, entry)]);
    bt.run(&frame).unwrap();
    assert!(!bt.ledger().is_empty());

    bt.reset();
    assert!(bt.ledger().is_empty());
    assert!(bt.holdings().is_empty());
    assert_eq!(bt.cash(), 10_000.0);
}

proptest! {
    /// Cash never goes negative and the ledger's total value always equals
    /// cash plus the book value of what is still open, whatever the advice.
    #[test]
    fn cash_stays_non_negative_under_arbitrary_advice(
        advices in prop::collection::vec(0u8..4, 5..30),
        closes in prop::collection::vec(1.0f64..500.0, 30),
    ) {
        let rows: Vec<_> = advices
            .iter()
            .zip(&closes)
            .enumerate()
            .map(|(i, (&a, &c))| {
                let advice = match a {
                    0 => Advice::Buy,
                    1 => Advice::Sell,
                    2 => Advice::Neutral,
                    _ => Advice::Hold,
                };
                (day(1) + chrono::Days::new(i as u64), c, advice)
            })
            .collect();
        let (series, entry) = ticker_table("AAA", &rows);
        let (mut bt, frame) = engine(5_000.0, DateRange::new(day(1), day(31)), vec![(series, entry)]);
        bt.run(&frame).unwrap();

        // replay the ledger: positions opened so far, valued at their buy
        // price plus cash, must reproduce every logged total_value
        let mut open: HashMap<&str, f64> = HashMap::new();
        for entry in bt.ledger() {
            prop_assert!(entry.cash >= 0.0);
            prop_assert!(entry.total_value >= 0.0);
            match entry.action {
                TransactionAction::Buy => {
                    open.insert(&entry.ticker, entry.shares as f64 * entry.price);
                }
                TransactionAction::SellSignal | TransactionAction::SellStopLoss => {
                    open.remove(entry.ticker.as_str());
                }
            }
            let book: f64 = open.values().sum();
            prop_assert!((entry.total_value - (entry.cash + book)).abs() < 1e-6);
        }
        prop_assert!(bt.cash() >= 0.0);
        // accounting identity at the end of the walk
        let book: f64 = bt.holdings().iter().map(|h| h.shares() as f64 * h.buy_price()).sum();
        prop_assert!((bt.total_value() - (bt.cash() + book)).abs() < 1e-6);
    }

    /// The starting cash plus every signed ledger amount reproduces the
    /// final cash balance.
    #[test]
    fn ledger_amounts_reconcile_with_cash(
        advices in prop::collection::vec(0u8..2, 5..30),
        closes in prop::collection::vec(1.0f64..500.0, 30),
    ) {
        let rows: Vec<_> = advices
            .iter()
            .zip(&closes)
            .enumerate()
            .map(|(i, (&a, &c))| {
                let advice = if a == 0 { Advice::Buy } else { Advice::Sell };
                (day(1) + chrono::Days::new(i as u64), c, advice)
            })
            .collect();
        let (series, entry) = ticker_table("AAA", &rows);
        let (mut bt, frame) = engine(8_000.0, DateRange::new(day(1), day(31)), vec![(series, entry)]);
        bt.run(&frame).unwrap();

        let replayed = 8_000.0 + bt.ledger().iter().map(|e| e.amount).sum::<f64>();
        prop_assert!((replayed - bt.cash()).abs() < 1e-6);
    }
}
