//! End-to-end backtests on small hand-built panels.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use ndarray::Array2;
use ronda_backtest::{Backtest, BacktestConfig, CostModel, PortfolioConfig, PortfolioMode, Selection};
use ronda_data::PricePanel;
use ronda_data::calendar::next_month_end;
use ronda_signals::MomentumSignal;
use std::collections::BTreeSet;

/// Three tickers over 14 months. Prices move linearly from `start` to `end`
/// over months 0..=12, then to `last` in month 13.
fn three_ticker_panel() -> PricePanel {
    let paths = [(100.0, 150.0, 165.0), (100.0, 90.0, 81.0), (50.0, 55.0, 55.0)];
    let mut months = vec![NaiveDate::from_ymd_opt(2010, 1, 31).unwrap()];
    while months.len() < 14 {
        let last = *months.last().unwrap();
        months.push(next_month_end(last));
    }
    let close = Array2::from_shape_fn((14, 3), |(t, j)| {
        let (start, end, last) = paths[j];
        if t == 13 {
            last
        } else {
            start + (end - start) * t as f64 / 12.0
        }
    });
    PricePanel::from_matrices(
        months,
        vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
        close.clone(),
        close,
    )
    .unwrap()
}

fn members(tickers: &[&str], months: usize) -> Vec<BTreeSet<String>> {
    vec![tickers.iter().map(|t| t.to_string()).collect(); months]
}

fn top_one(cost_bps: f64) -> BacktestConfig {
    BacktestConfig {
        portfolio: PortfolioConfig {
            selection: Selection::TopN(1),
            mode: PortfolioMode::LongShort,
            min_names: 1,
        },
        costs: CostModel::new(cost_bps).unwrap(),
        ..Default::default()
    }
}

#[test]
fn test_hand_computed_twelve_one_portfolio() {
    let panel = three_ticker_panel();
    let returns = panel.monthly_returns();
    let result = Backtest::new(top_one(10.0))
        .unwrap()
        .run(&MomentumSignal::default(), &panel, &returns, &members(&["AAA", "BBB", "CCC"], 14))
        .unwrap();

    // Signals at month 13: AAA +50%, CCC +10%, BBB -10%.
    assert_eq!(result.len(), 1);
    let snapshot = &result.snapshots()[0];
    assert_eq!(snapshot.long_tickers, ["AAA".to_string()].into_iter().collect());
    assert_eq!(snapshot.short_tickers, ["BBB".to_string()].into_iter().collect());

    // AAA +10%, BBB -10% in the holding month.
    let record = &result.records()[0];
    assert_relative_eq!(record.gross_return, 0.1, epsilon = 1e-12);
    assert_relative_eq!(record.turnover, 1.0);
    assert_relative_eq!(record.net_return, 0.1 - 0.001, epsilon = 1e-12);
}

#[test]
fn test_non_members_are_never_held() {
    let panel = three_ticker_panel();
    let returns = panel.monthly_returns();
    // AAA left the index before the holding month.
    let result = Backtest::new(top_one(10.0))
        .unwrap()
        .run(&MomentumSignal::default(), &panel, &returns, &members(&["BBB", "CCC"], 14))
        .unwrap();

    let snapshot = &result.snapshots()[0];
    assert_eq!(snapshot.weight("AAA"), 0.0);
    assert_eq!(snapshot.long_tickers, ["CCC".to_string()].into_iter().collect());
    assert_relative_eq!(result.records()[0].gross_return, 0.05, epsilon = 1e-12);
}

#[test]
fn test_short_history_excluded() {
    let panel = three_ticker_panel();
    let mut close = panel.close().clone();
    // AAA has no price 13 months before the holding month.
    close[[0, 0]] = f64::NAN;
    let panel = PricePanel::from_matrices(
        panel.months().to_vec(),
        panel.tickers().to_vec(),
        close.clone(),
        close,
    )
    .unwrap();
    let returns = panel.monthly_returns();
    let result = Backtest::new(top_one(10.0))
        .unwrap()
        .run(&MomentumSignal::default(), &panel, &returns, &members(&["AAA", "BBB", "CCC"], 14))
        .unwrap();

    let snapshot = &result.snapshots()[0];
    assert!(!snapshot.weights.contains_key("AAA"));
    assert_eq!(snapshot.long_tickers, ["CCC".to_string()].into_iter().collect());
}

#[test]
fn test_costs_non_negative_and_deterministic() {
    let months = 40;
    let tickers: Vec<String> = (0..8).map(|i| format!("T{i}")).collect();
    let mut dates = vec![NaiveDate::from_ymd_opt(2001, 1, 31).unwrap()];
    while dates.len() < months {
        let last = *dates.last().unwrap();
        dates.push(next_month_end(last));
    }
    // deterministic pseudo-random walk
    let close = Array2::from_shape_fn((months, tickers.len()), |(t, j)| {
        let phase = ((t * 7 + j * 13) % 11) as f64 / 11.0;
        100.0 * (1.0 + 0.01 * j as f64) * (1.0 + 0.05 * (phase - 0.5)).powi(t as i32 % 5 + 1)
    });
    let panel = PricePanel::from_matrices(dates, tickers.clone(), close.clone(), close).unwrap();
    let returns = panel.monthly_returns();
    let eligible = vec![tickers.into_iter().collect::<BTreeSet<_>>(); months];

    let config = BacktestConfig {
        portfolio: PortfolioConfig {
            selection: Selection::Quantile(0.25),
            ..Default::default()
        },
        costs: CostModel {
            cost_bps: 25.0,
            drift_weights: true,
        },
        ..Default::default()
    };
    let backtest = Backtest::new(config).unwrap();
    let first = backtest.run(&MomentumSignal::default(), &panel, &returns, &eligible).unwrap();
    let second = backtest.run(&MomentumSignal::default(), &panel, &returns, &eligible).unwrap();

    assert_eq!(first.records(), second.records());
    assert_eq!(first.snapshots(), second.snapshots());
    assert!(first.records().iter().all(|r| r.cost >= 0.0 && r.turnover >= 0.0));
    assert!(first.records().iter().all(|r| r.net_return <= r.gross_return));
}
