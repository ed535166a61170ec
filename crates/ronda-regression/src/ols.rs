//! Ordinary least squares with Newey-West standard errors.
//!
//! Coefficients are `(X'X)^-1 X'y`. The coefficient covariance is the HAC
//! sandwich `(X'X)^-1 S (X'X)^-1`, where `S` is the Newey-West long-run
//! covariance of the scores `x_t * u_t` scaled to a sum over observations.
//! With zero lags this is White's heteroskedasticity-robust covariance.

use crate::covariance::{CovarianceEstimator, NeweyWestConfig, NeweyWestEstimator};
use crate::error::{RegressionError, Result};
use crate::linalg::invert;
use crate::normal::{standard_normal, two_sided_p_value};
use ndarray::{Array1, Array2, Axis, concatenate};
use serde::{Deserialize, Serialize};

/// Name given to the intercept column.
pub const INTERCEPT: &str = "const";

/// Regression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OlsConfig {
    /// Prepend a constant column (default: true)
    pub add_intercept: bool,
    /// HAC settings for the score covariance
    pub newey_west: NeweyWestConfig,
    /// Scale the covariance by `n / (n - k)` (default: false)
    pub small_sample_correction: bool,
}

impl Default for OlsConfig {
    fn default() -> Self {
        Self {
            add_intercept: true,
            newey_west: NeweyWestConfig::default(),
            small_sample_correction: false,
        }
    }
}

/// A fitted regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Regressor names, intercept first when present
    pub names: Vec<String>,
    /// Estimated coefficients
    pub params: Array1<f64>,
    /// HAC standard errors
    pub std_errors: Array1<f64>,
    /// t-statistics
    pub t_values: Array1<f64>,
    /// Two-sided normal p-values
    pub p_values: Array1<f64>,
    /// Coefficient covariance
    pub covariance: Array2<f64>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// R² adjusted for the number of regressors
    pub adj_r_squared: f64,
    /// Observations used
    pub nobs: usize,
    /// Lags used for the HAC covariance
    pub lags: usize,
    /// Fitted residuals
    pub residuals: Array1<f64>,
}

impl RegressionResult {
    /// Position of a regressor by name.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Coefficient of a regressor.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.params[i])
    }

    /// t-statistic of a regressor.
    pub fn t_value(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.t_values[i])
    }

    /// p-value of a regressor.
    pub fn p_value(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.p_values[i])
    }

    /// Intercept, if the model has one.
    pub fn alpha(&self) -> Option<f64> {
        self.param(INTERCEPT)
    }
}

/// OLS estimator.
#[derive(Debug, Clone, Default)]
pub struct OlsRegression {
    config: OlsConfig,
}

impl OlsRegression {
    /// Create an estimator.
    pub const fn new(config: OlsConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &OlsConfig {
        &self.config
    }

    /// Regress `y` on the columns of `x`.
    ///
    /// # Arguments
    /// * `y` - Dependent variable, one value per observation
    /// * `x` - Regressors, one row per observation (without intercept)
    /// * `names` - One name per column of `x`
    pub fn fit<S: AsRef<str>>(&self, y: &Array1<f64>, x: &Array2<f64>, names: &[S]) -> Result<RegressionResult> {
        let n = y.len();
        if x.nrows() != n {
            return Err(RegressionError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }
        if names.len() != x.ncols() {
            return Err(RegressionError::DimensionMismatch {
                expected: x.ncols(),
                actual: names.len(),
            });
        }
        if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
            return Err(RegressionError::InvalidParameter(
                "regression inputs must be finite".to_string(),
            ));
        }

        let (design, names) = if self.config.add_intercept {
            let ones = Array2::<f64>::ones((n, 1));
            let design = concatenate(Axis(1), &[ones.view(), x.view()])
                .map_err(|e| RegressionError::InvalidParameter(e.to_string()))?;
            let names: Vec<String> = std::iter::once(INTERCEPT.to_string())
                .chain(names.iter().map(|s| s.as_ref().to_string()))
                .collect();
            (design, names)
        } else {
            (x.clone(), names.iter().map(|s| s.as_ref().to_string()).collect())
        };
        let k = design.ncols();
        if k == 0 {
            return Err(RegressionError::InvalidParameter("no regressors".to_string()));
        }
        if n <= k {
            return Err(RegressionError::InsufficientData {
                required: k + 1,
                actual: n,
            });
        }

        let xtx_inv = invert(&design.t().dot(&design))?;
        let params = xtx_inv.dot(&design.t().dot(y));
        let fitted = design.dot(&params);
        let residuals = y - &fitted;

        let scores = &design * &residuals.view().insert_axis(Axis(1));
        let estimator = NeweyWestEstimator::new(self.config.newey_west);
        let meat = estimator.estimate(&scores)? * n as f64;
        let mut covariance = xtx_inv.dot(&meat).dot(&xtx_inv);
        if self.config.small_sample_correction {
            covariance *= n as f64 / (n - k) as f64;
        }

        let std_errors = covariance.diag().mapv(|v| v.max(0.0).sqrt());
        let t_values = ndarray::Zip::from(&params)
            .and(&std_errors)
            .map_collect(|&b, &se| if se > 0.0 { b / se } else { f64::NAN });
        let normal = standard_normal()?;
        let p_values = t_values.mapv(|t| two_sided_p_value(&normal, t));

        let ssr = residuals.dot(&residuals);
        let sst = if self.config.add_intercept {
            let mean = y.mean().unwrap_or(0.0);
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(y)
        };
        let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
        let df_total = if self.config.add_intercept { n - 1 } else { n };
        let adj_r_squared = 1.0 - (1.0 - r_squared) * df_total as f64 / (n - k) as f64;

        Ok(RegressionResult {
            names,
            params,
            std_errors,
            t_values,
            p_values,
            covariance,
            r_squared,
            adj_r_squared,
            nobs: n,
            lags: estimator.lags_for(n),
            residuals,
        })
    }
}
