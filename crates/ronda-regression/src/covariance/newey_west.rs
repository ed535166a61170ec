//! Newey-West HAC (Heteroskedasticity and Autocorrelation Consistent) Covariance Estimator
//!
//! Adds lagged cross-products with Bartlett kernel weights to the contemporaneous
//! covariance:
//! ```text
//! Ω = Γ_0 + Σ_{l=1}^{L} w_l * (Γ_l + Γ_l^T)
//! where:
//! - Γ_l = (1/T) Σ_{t=l+1}^T z_t z_{t-l}^T
//! - z_t = x_t - μ when demeaning, x_t otherwise
//! - w_l = 1 - l/(L+1) (Bartlett kernel weights)
//! - L = fixed lag, or ceil(4*(T/100)^(2/9)) when automatic
//! ```
//!
//! Regression scores have mean zero by construction, so they are used as-is.
//!
//! # References
//! - Newey, W. K., & West, K. D. (1987). "A Simple, Positive Semi-Definite,
//!   Heteroskedasticity and Autocorrelation Consistent Covariance Matrix."
//!   Econometrica, 55(3), 703-708.

use super::CovarianceEstimator;
use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};

/// Newey-West estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeweyWestConfig {
    /// Minimum number of observations required (default: 2)
    pub min_observations: usize,

    /// Number of lags (default: 6). `None` selects ceil(4*(T/100)^(2/9)).
    pub lags: Option<usize>,

    /// Subtract column means before estimation (default: false)
    pub demean: bool,
}

impl Default for NeweyWestConfig {
    fn default() -> Self {
        Self {
            min_observations: 2,
            lags: Some(6),
            demean: false,
        }
    }
}

/// Newey-West HAC covariance estimator
#[derive(Debug, Default, Clone)]
pub struct NeweyWestEstimator {
    config: NeweyWestConfig,
}

impl NeweyWestEstimator {
    /// Create a new Newey-West estimator with the given configuration
    pub const fn new(config: NeweyWestConfig) -> Self {
        Self { config }
    }

    /// The configuration in use
    pub const fn config(&self) -> &NeweyWestConfig {
        &self.config
    }

    /// Lag length for a sample of `n_periods`, clamped to `n_periods - 1`
    pub fn lags_for(&self, n_periods: usize) -> usize {
        let lags = self.config.lags.unwrap_or_else(|| {
            let t = n_periods as f64;
            (4.0 * (t / 100.0).powf(2.0 / 9.0)).ceil() as usize
        });
        lags.min(n_periods.saturating_sub(1))
    }

    /// Bartlett kernel weight `1 - l/(L+1)`; zero beyond `max_lag`
    pub const fn bartlett_weight(lag: usize, max_lag: usize) -> f64 {
        if lag > max_lag {
            0.0
        } else {
            1.0 - (lag as f64) / (max_lag as f64 + 1.0)
        }
    }

    fn centered(&self, observations: &Array2<f64>) -> Array2<f64> {
        if !self.config.demean {
            return observations.clone();
        }
        let means: Array1<f64> = observations
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(observations.ncols()));
        observations - &means
    }

    /// `Γ_l = (1/T) Σ_t z_t z_{t-l}^T`
    fn lagged_covariance(z: &Array2<f64>, lag: usize) -> Array2<f64> {
        let n = z.nrows();
        let lead = z.slice(s![lag.., ..]);
        let lagged = z.slice(s![..n - lag, ..]);
        lead.t().dot(&lagged) / n as f64
    }
}

impl CovarianceEstimator for NeweyWestEstimator {
    fn estimate(&self, observations: &Array2<f64>) -> Result<Array2<f64>> {
        let n_periods = observations.nrows();
        let required = self.config.min_observations.max(1);
        if n_periods < required {
            return Err(RegressionError::InsufficientData {
                required,
                actual: n_periods,
            });
        }
        if observations.iter().any(|v| !v.is_finite()) {
            return Err(RegressionError::InvalidParameter(
                "observations must be finite".to_string(),
            ));
        }

        let z = self.centered(observations);
        let max_lag = self.lags_for(n_periods);

        let mut cov = Self::lagged_covariance(&z, 0);
        for lag in 1..=max_lag {
            let weight = Self::bartlett_weight(lag, max_lag);
            let gamma = Self::lagged_covariance(&z, lag);
            cov = cov + (&gamma + &gamma.t()) * weight;
        }
        Ok(cov)
    }
}
