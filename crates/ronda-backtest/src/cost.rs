//! Turnover and transaction costs.

use crate::error::{BacktestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Proportional transaction costs charged on traded weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Cost per unit of traded weight, in basis points (default: 10)
    pub cost_bps: f64,
    /// Drift last month's weights with realised returns before measuring
    /// turnover
    pub drift_weights: bool,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cost_bps: 10.0,
            drift_weights: false,
        }
    }
}

impl CostModel {
    /// A cost model charging `cost_bps` per unit of turnover.
    pub fn new(cost_bps: f64) -> Result<Self> {
        let model = Self {
            cost_bps,
            ..Self::default()
        };
        model.validate()?;
        Ok(model)
    }

    /// Costs must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.cost_bps.is_finite() || self.cost_bps < 0.0 {
            return Err(BacktestError::InvalidConfig(format!(
                "cost must be a non-negative number of bps, got {}",
                self.cost_bps
            )));
        }
        Ok(())
    }

    /// Cost as a fraction of capital for a given turnover.
    pub fn cost(&self, turnover: f64) -> f64 {
        turnover * self.cost_bps / 10_000.0
    }
}

/// Sum of absolute weight changes between two books.
pub fn turnover(previous: &BTreeMap<String, f64>, next: &BTreeMap<String, f64>) -> f64 {
    let tickers: BTreeSet<&String> = previous.keys().chain(next.keys()).collect();
    tickers
        .into_iter()
        .map(|t| {
            let before = previous.get(t).copied().unwrap_or(0.0);
            let after = next.get(t).copied().unwrap_or(0.0);
            (after - before).abs()
        })
        .sum()
}

/// Weights after one month of returns, rescaled to the original gross
/// exposure. A missing return leaves a weight unchanged.
pub fn drift<F>(weights: &BTreeMap<String, f64>, mut month_return: F) -> BTreeMap<String, f64>
where
    F: FnMut(&str) -> Option<f64>,
{
    let gross: f64 = weights.values().map(|w| w.abs()).sum();
    let grown: BTreeMap<String, f64> = weights
        .iter()
        .map(|(t, w)| {
            let r = month_return(t).filter(|r| r.is_finite()).unwrap_or(0.0);
            (t.clone(), w * (1.0 + r))
        })
        .collect();
    let grown_gross: f64 = grown.values().map(|w| w.abs()).sum();
    if grown_gross <= f64::EPSILON {
        return grown;
    }
    let scale = gross / grown_gross;
    grown.into_iter().map(|(t, w)| (t, w * scale)).collect()
}
