//! Trailing-return momentum.
//!
//! For holding month `M` the score is
//! `signal_close(M - skip) / signal_close(M - skip - lookback) - 1`.
//! With the defaults (lookback 12, skip 1) this is the classic 12–1 signal:
//! the return from month `M-13` to `M-1`, ignoring the most recent month to
//! sidestep short-term reversal.

use crate::error::{Result, SignalError};
use crate::signal::{CrossSectionalSignal, MonthlySignal};
use ronda_data::PricePanel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Configuration for [`MomentumSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Formation window in months (default: 12)
    pub lookback: usize,
    /// Most recent months excluded from the window (default: 1)
    pub skip: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback: 12,
            skip: 1,
        }
    }
}

impl MomentumConfig {
    /// Check that the window is non-empty and excludes the holding month.
    pub fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(SignalError::InvalidConfig(
                "lookback must be at least one month".to_string(),
            ));
        }
        if self.skip == 0 {
            return Err(SignalError::InvalidConfig(
                "skip must be at least one month; the holding month's price is not known at formation"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Trailing-return momentum signal.
#[derive(Debug, Clone)]
pub struct MomentumSignal {
    config: MomentumConfig,
    name: String,
}

impl MomentumSignal {
    /// Create a signal from a validated configuration.
    pub fn new(config: MomentumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: format!("momentum_{}_{}", config.lookback, config.skip),
            config,
        })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &MomentumConfig {
        &self.config
    }
}

impl Default for MomentumSignal {
    fn default() -> Self {
        let config = MomentumConfig::default();
        Self {
            name: format!("momentum_{}_{}", config.lookback, config.skip),
            config,
        }
    }
}

impl CrossSectionalSignal for MomentumSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.config.lookback + self.config.skip
    }

    fn score_month(
        &self,
        panel: &PricePanel,
        eligible: &BTreeSet<String>,
        month_idx: usize,
    ) -> Result<Vec<MonthlySignal>> {
        let months = panel.n_months();
        if month_idx >= months {
            return Err(SignalError::MonthOutOfRange {
                index: month_idx,
                months,
            });
        }
        let as_of_month = panel.months()[month_idx];
        let Some(start_idx) = month_idx.checked_sub(self.min_history()) else {
            return Ok(Vec::new());
        };
        let end_idx = month_idx - self.config.skip;
        let prices = panel.signal_close();

        let signals: Vec<MonthlySignal> = eligible
            .iter()
            .filter_map(|ticker| {
                let j = panel.ticker_index(ticker)?;
                let (start, end) = (prices[[start_idx, j]], prices[[end_idx, j]]);
                (start.is_finite() && end.is_finite()).then(|| MonthlySignal {
                    ticker: ticker.clone(),
                    as_of_month,
                    trailing_return: end / start - 1.0,
                })
            })
            .collect();

        debug!(
            signal = %self.name,
            month = %as_of_month,
            eligible = eligible.len(),
            scored = signals.len(),
            "scored month"
        );
        Ok(signals)
    }
}
