//! Monthly rebalanced backtest engine.
//!
//! Each holding month `t` the engine scores the eligible tickers with the
//! signal, builds a fresh snapshot, charges costs on the turnover from the
//! previous book, and earns the month's returns on the new weights.

use crate::cost::{CostModel, drift, turnover};
use crate::error::{BacktestError, Result};
use crate::portfolio::{PortfolioConfig, PortfolioConstructor, PortfolioSnapshot};
use chrono::NaiveDate;
use ndarray::Array2;
use ronda_data::PricePanel;
use ronda_signals::CrossSectionalSignal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Backtesting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Portfolio construction
    pub portfolio: PortfolioConfig,
    /// Transaction costs
    pub costs: CostModel,
    /// First holding month to trade (inclusive)
    pub start: Option<NaiveDate>,
    /// Last holding month to trade (inclusive)
    pub end: Option<NaiveDate>,
}

/// Outcome of one holding month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    /// Holding month (month end)
    pub month: NaiveDate,
    /// Return before costs
    pub gross_return: f64,
    /// Sum of absolute weight changes at formation
    pub turnover: f64,
    /// Cost charged for the turnover
    pub cost: f64,
    /// Return after costs
    pub net_return: f64,
    /// Names in the long leg
    pub n_long: usize,
    /// Names in the short leg
    pub n_short: usize,
}

/// Monthly results of a backtest, in month order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    signal: String,
    records: Vec<MonthRecord>,
    snapshots: Vec<PortfolioSnapshot>,
}

impl BacktestResult {
    /// Name of the signal that was traded.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// One record per traded month.
    pub fn records(&self) -> &[MonthRecord] {
        &self.records
    }

    /// Holdings per traded month.
    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    /// Number of traded months.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no month was traded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Holding months.
    pub fn months(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.month).collect()
    }

    /// Returns before costs.
    pub fn gross_returns(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.gross_return).collect()
    }

    /// Returns after costs.
    pub fn net_returns(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.net_return).collect()
    }

    /// Turnover per month.
    pub fn turnover(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.turnover).collect()
    }

    /// Net returns recomputed under a different cost level.
    pub fn net_returns_at(&self, cost_bps: f64) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.gross_return - r.turnover * cost_bps / 10_000.0)
            .collect()
    }

    /// Total cost paid over the backtest.
    pub fn total_cost(&self) -> f64 {
        self.records.iter().map(|r| r.cost).sum()
    }
}

/// Backtesting engine.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    constructor: PortfolioConstructor,
}

impl Backtest {
    /// Create a backtest from a validated configuration.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.costs.validate()?;
        if let (Some(start), Some(end)) = (config.start, config.end)
            && start > end
        {
            return Err(BacktestError::InvalidConfig(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self {
            constructor: PortfolioConstructor::new(config.portfolio)?,
            config,
        })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run `signal` over the panel.
    ///
    /// # Arguments
    /// * `panel` - Month-end prices
    /// * `returns` - Monthly returns aligned with `panel` (cleaned as desired)
    /// * `eligible` - Per panel month, the tickers that may be held that month
    ///
    /// Trading starts at the first month with enough history for the signal.
    /// A held ticker without a return that month contributes zero.
    pub fn run<S: CrossSectionalSignal>(
        &self,
        signal: &S,
        panel: &PricePanel,
        returns: &Array2<f64>,
        eligible: &[BTreeSet<String>],
    ) -> Result<BacktestResult> {
        let n_months = panel.n_months();
        if returns.dim() != (n_months, panel.n_tickers()) {
            return Err(BacktestError::DimensionMismatch {
                expected: format!("{}x{} returns", n_months, panel.n_tickers()),
                actual: format!("{}x{}", returns.nrows(), returns.ncols()),
            });
        }
        if eligible.len() != n_months {
            return Err(BacktestError::DimensionMismatch {
                expected: format!("{n_months} eligibility sets"),
                actual: eligible.len().to_string(),
            });
        }

        let first = signal.min_history().max(1);
        let in_window = |month: NaiveDate| {
            self.config.start.is_none_or(|s| month >= s) && self.config.end.is_none_or(|e| month <= e)
        };
        let trade_months: Vec<usize> = (first..n_months)
            .filter(|&t| in_window(panel.months()[t]))
            .collect();
        if trade_months.is_empty() {
            return Err(BacktestError::NoPeriods(format!(
                "{} months of prices, signal {} needs {} months of history",
                n_months,
                signal.name(),
                first
            )));
        }

        let month_return = |t: usize, ticker: &str| -> Option<f64> {
            panel
                .ticker_index(ticker)
                .map(|j| returns[[t, j]])
                .filter(|r| r.is_finite())
        };

        let mut records = Vec::with_capacity(trade_months.len());
        let mut snapshots: Vec<PortfolioSnapshot> = Vec::with_capacity(trade_months.len());
        let mut previous: BTreeMap<String, f64> = BTreeMap::new();

        for t in trade_months {
            let month = panel.months()[t];
            let signals = signal.score_month(panel, &eligible[t], t)?;
            let snapshot = self.constructor.build(month, &signals);

            let traded = turnover(&previous, &snapshot.weights);
            let cost = self.config.costs.cost(traded);
            let gross: f64 = snapshot
                .weights
                .iter()
                .map(|(ticker, w)| w * month_return(t, ticker).unwrap_or(0.0))
                .sum();

            debug!(
                %month,
                scored = signals.len(),
                long = snapshot.long_tickers.len(),
                short = snapshot.short_tickers.len(),
                gross,
                turnover = traded,
                "rebalanced"
            );

            records.push(MonthRecord {
                month,
                gross_return: gross,
                turnover: traded,
                cost,
                net_return: gross - cost,
                n_long: snapshot.long_tickers.len(),
                n_short: snapshot.short_tickers.len(),
            });

            previous = if self.config.costs.drift_weights {
                drift(&snapshot.weights, |ticker| month_return(t, ticker))
            } else {
                snapshot.weights.clone()
            };
            snapshots.push(snapshot);
        }

        let result = BacktestResult {
            signal: signal.name().to_string(),
            records,
            snapshots,
        };
        info!(
            signal = result.signal(),
            months = result.len(),
            total_cost = result.total_cost(),
            "backtest complete"
        );
        Ok(result)
    }
}
