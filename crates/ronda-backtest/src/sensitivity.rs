//! Transaction-cost and lookback robustness grids.

use crate::engine::{Backtest, BacktestConfig, BacktestResult};
use crate::error::Result;
use crate::metrics::{PerformanceConfig, PerformanceSummary};
use ndarray::Array2;
use ronda_data::PricePanel;
use ronda_signals::{MomentumConfig, MomentumSignal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Cost levels evaluated by default, in bps.
pub const DEFAULT_COST_GRID_BPS: [f64; 4] = [5.0, 10.0, 15.0, 25.0];

/// Lookbacks evaluated by default, in months.
pub const DEFAULT_LOOKBACKS: [usize; 4] = [6, 9, 12, 18];

/// Net performance at one cost level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSensitivityRow {
    /// Cost per unit of turnover, in bps
    pub cost_bps: f64,
    /// Statistics of the net returns
    pub summary: PerformanceSummary,
}

/// Net performance for one momentum lookback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookbackRow {
    /// Formation window in months
    pub lookback: usize,
    /// Months traded
    pub months: usize,
    /// Mean monthly turnover
    pub mean_turnover: f64,
    /// Statistics of the net returns
    pub summary: PerformanceSummary,
}

/// Re-price an existing backtest at each cost level.
///
/// Portfolios do not depend on costs, so only the net returns change.
pub fn cost_grid(
    result: &BacktestResult,
    costs_bps: &[f64],
    performance: &PerformanceConfig,
) -> Vec<CostSensitivityRow> {
    costs_bps
        .iter()
        .map(|&cost_bps| CostSensitivityRow {
            cost_bps,
            summary: PerformanceSummary::from_returns(&result.net_returns_at(cost_bps), performance),
        })
        .collect()
}

/// Rerun the momentum backtest for each lookback, keeping `skip` and the
/// rest of `config` fixed.
pub fn lookback_grid(
    config: BacktestConfig,
    skip: usize,
    panel: &PricePanel,
    returns: &Array2<f64>,
    eligible: &[BTreeSet<String>],
    lookbacks: &[usize],
    performance: &PerformanceConfig,
) -> Result<Vec<LookbackRow>> {
    let backtest = Backtest::new(config)?;
    lookbacks
        .iter()
        .map(|&lookback| {
            let signal = MomentumSignal::new(MomentumConfig { lookback, skip })?;
            let result = backtest.run(&signal, panel, returns, eligible)?;
            let turnover = result.turnover();
            let row = LookbackRow {
                lookback,
                months: result.len(),
                mean_turnover: crate::metrics::mean(&turnover),
                summary: PerformanceSummary::from_returns(&result.net_returns(), performance),
            };
            info!(lookback, sharpe = row.summary.sharpe, "lookback evaluated");
            Ok(row)
        })
        .collect()
}
