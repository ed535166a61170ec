//! Portfolio construction from ranked signals.

use crate::error::{BacktestError, Result};
use chrono::NaiveDate;
use ronda_signals::{MonthlySignal, percentile_ranks, sort_descending};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How the long and short legs are picked from the ranked cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// The `n` highest signals long and the `n` lowest short.
    TopN(usize),
    /// Percentile rank `>= 1 - q` long and `<= q` short.
    Quantile(f64),
}

/// Which legs the portfolio holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioMode {
    /// Long winners, short losers; each leg carries half the gross exposure.
    #[default]
    LongShort,
    /// Long winners only, fully invested.
    LongOnly,
}

/// Portfolio construction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Leg selection rule (default: top/bottom 50)
    pub selection: Selection,
    /// Long/short or long-only
    pub mode: PortfolioMode,
    /// Fewest names a required leg may hold before the month is skipped
    pub min_names: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            selection: Selection::TopN(50),
            mode: PortfolioMode::LongShort,
            min_names: 1,
        }
    }
}

impl PortfolioConfig {
    /// Reject selections that can never produce a portfolio.
    pub fn validate(&self) -> Result<()> {
        match self.selection {
            Selection::TopN(0) => Err(BacktestError::InvalidConfig(
                "top-N selection needs at least one name".to_string(),
            )),
            Selection::Quantile(q) if !(q > 0.0 && q <= 0.5) => Err(BacktestError::InvalidConfig(
                format!("quantile must lie in (0, 0.5], got {q}"),
            )),
            _ if self.min_names == 0 => Err(BacktestError::InvalidConfig(
                "min_names must be at least one".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Holdings for one month. Built once per month and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Holding month (month end)
    pub month: NaiveDate,
    /// Long leg
    pub long_tickers: BTreeSet<String>,
    /// Short leg
    pub short_tickers: BTreeSet<String>,
    /// Signed weights; longs positive, shorts negative
    pub weights: BTreeMap<String, f64>,
}

impl PortfolioSnapshot {
    /// A month with no positions.
    pub const fn empty(month: NaiveDate) -> Self {
        Self {
            month,
            long_tickers: BTreeSet::new(),
            short_tickers: BTreeSet::new(),
            weights: BTreeMap::new(),
        }
    }

    /// Whether no position is held.
    pub fn is_flat(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of a ticker, zero when not held.
    pub fn weight(&self, ticker: &str) -> f64 {
        self.weights.get(ticker).copied().unwrap_or(0.0)
    }

    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }

    /// Sum of signed weights.
    pub fn net_exposure(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Builds equal-weighted snapshots from monthly signals.
#[derive(Debug, Clone)]
pub struct PortfolioConstructor {
    config: PortfolioConfig,
}

impl PortfolioConstructor {
    /// Create a constructor from a validated configuration.
    pub fn new(config: PortfolioConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Rank `signals` and form the snapshot for `month`.
    ///
    /// Signals are ranked by trailing return, highest first, ties broken by
    /// ticker. A month whose required legs have fewer than `min_names` names
    /// is flat.
    pub fn build(&self, month: NaiveDate, signals: &[MonthlySignal]) -> PortfolioSnapshot {
        let mut ranked: Vec<MonthlySignal> = signals
            .iter()
            .filter(|s| s.trailing_return.is_finite())
            .cloned()
            .collect();
        sort_descending(&mut ranked);

        let long_short = self.config.mode == PortfolioMode::LongShort;
        let (long, short) = match self.config.selection {
            Selection::TopN(n) => {
                let n_long = n.min(ranked.len());
                let long: BTreeSet<String> =
                    ranked[..n_long].iter().map(|s| s.ticker.clone()).collect();
                let short: BTreeSet<String> = if long_short {
                    let from = ranked.len().saturating_sub(n).max(n_long);
                    ranked[from..].iter().map(|s| s.ticker.clone()).collect()
                } else {
                    BTreeSet::new()
                };
                (long, short)
            }
            Selection::Quantile(q) => {
                let values: Vec<f64> = ranked.iter().map(|s| s.trailing_return).collect();
                let ranks = percentile_ranks(&values);
                let long: BTreeSet<String> = ranked
                    .iter()
                    .zip(&ranks)
                    .filter(|(_, r)| **r >= 1.0 - q)
                    .map(|(s, _)| s.ticker.clone())
                    .collect();
                let short: BTreeSet<String> = if long_short {
                    ranked
                        .iter()
                        .zip(&ranks)
                        .filter(|(s, r)| **r <= q && !long.contains(&s.ticker))
                        .map(|(s, _)| s.ticker.clone())
                        .collect()
                } else {
                    BTreeSet::new()
                };
                (long, short)
            }
        };

        let min = self.config.min_names;
        if long.len() < min || (long_short && short.len() < min) {
            return PortfolioSnapshot::empty(month);
        }

        let long_budget = if long_short { 0.5 } else { 1.0 };
        let long_weight = long_budget / long.len() as f64;
        let mut weights: BTreeMap<String, f64> =
            long.iter().map(|t| (t.clone(), long_weight)).collect();
        if long_short {
            let short_weight = -0.5 / short.len() as f64;
            weights.extend(short.iter().map(|t| (t.clone(), short_weight)));
        }

        PortfolioSnapshot {
            month,
            long_tickers: long,
            short_tickers: short,
            weights,
        }
    }
}
