//! Bootstrap test of CAPM alpha.
//!
//! Months are resampled with replacement and the CAPM line is refitted on
//! each sample. The p-value is the share of resampled alphas at least as
//! large in magnitude as the full-sample alpha.

use crate::error::{RegressionError, Result};
use crate::models::{FactorModel, excess_design};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ronda_data::{FactorTable, ReturnSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Bootstrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Resamples to draw (default: 1000)
    pub n_iters: usize,
    /// RNG seed; `None` draws from OS entropy (default: 42)
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_iters: 1000,
            seed: Some(42),
        }
    }
}

/// Outcome of a bootstrap alpha test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapAlpha {
    /// Full-sample monthly alpha
    pub alpha: f64,
    /// Full-sample market beta
    pub beta: f64,
    /// Empirical two-sided p-value
    pub p_value: f64,
    /// Resamples with a usable fit
    pub n_valid: usize,
    /// Observations in the full sample
    pub nobs: usize,
}

/// Intercept and slope of a simple regression of `y` on `x`.
///
/// Closed form of the two-regressor fit [`OlsRegression`] would give, without
/// the design matrix, inverse and HAC covariance it builds; every resample
/// only needs the intercept. `None` when `x` has no variation.
///
/// [`OlsRegression`]: crate::ols::OlsRegression
pub fn simple_ols(y: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    let n = y.len().min(x.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxy, sxx), (xi, yi)| {
            let dx = xi - mean_x;
            (sxy + dx * (yi - mean_y), sxx + dx * dx)
        });
    let scale: f64 = x[..n].iter().map(|v| v * v).sum();
    if sxx <= 1e-12 * scale || sxx == 0.0 {
        return None;
    }
    let beta = sxy / sxx;
    Some((mean_y - beta * mean_x, beta))
}

/// Bootstrap the intercept of `y = α + β x + ε`.
pub fn bootstrap_alpha(y: &[f64], x: &[f64], config: &BootstrapConfig) -> Result<BootstrapAlpha> {
    if y.len() != x.len() {
        return Err(RegressionError::DimensionMismatch {
            expected: y.len(),
            actual: x.len(),
        });
    }
    if config.n_iters == 0 {
        return Err(RegressionError::InvalidParameter(
            "bootstrap needs at least one resample".to_string(),
        ));
    }
    let n = y.len();
    if n < 3 {
        return Err(RegressionError::InsufficientData { required: 3, actual: n });
    }
    let (alpha, beta) = simple_ols(y, x)
        .ok_or_else(|| RegressionError::Singular("market excess return is constant".to_string()))?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut sample_y = vec![0.0; n];
    let mut sample_x = vec![0.0; n];
    let mut n_valid = 0usize;
    let mut n_extreme = 0usize;
    for _ in 0..config.n_iters {
        for (sy, sx) in sample_y.iter_mut().zip(sample_x.iter_mut()) {
            let j = rng.gen_range(0..n);
            *sy = y[j];
            *sx = x[j];
        }
        if let Some((alpha_star, _)) = simple_ols(&sample_y, &sample_x) {
            n_valid += 1;
            if alpha_star.abs() >= alpha.abs() {
                n_extreme += 1;
            }
        }
    }
    if n_valid == 0 {
        return Err(RegressionError::Singular(
            "every resample had a constant market return".to_string(),
        ));
    }
    debug!(n_valid, n_extreme, "bootstrap resamples");

    Ok(BootstrapAlpha {
        alpha,
        beta,
        p_value: n_extreme as f64 / n_valid as f64,
        n_valid,
        nobs: n,
    })
}

/// Bootstrap the CAPM alpha of a strategy series against `Mkt-RF`.
pub fn bootstrap_capm(
    series: &ReturnSeries,
    factors: &FactorTable,
    config: &BootstrapConfig,
) -> Result<BootstrapAlpha> {
    let (y, x) = excess_design(series, factors, FactorModel::Capm.factors())?;
    let market = x.column(0).to_vec();
    let result = bootstrap_alpha(&y.to_vec(), &market, config)?;
    info!(
        series = %series.name,
        alpha = result.alpha,
        p_value = result.p_value,
        iters = config.n_iters,
        "bootstrap CAPM alpha"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(alpha: f64) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..120).map(|t| 0.04 * ((t as f64) * 0.9).sin()).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(t, m)| alpha + 0.8 * m + 0.01 * ((t as f64) * 2.3).cos())
            .collect();
        (y, x)
    }

    #[test]
    fn test_simple_ols() {
        let (alpha, beta) = simple_ols(&[1.0, 3.0, 5.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(alpha, 1.0);
        assert_relative_eq!(beta, 2.0);
        assert!(simple_ols(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_simple_ols_matches_full_regression() {
        let (y, x) = sample(0.01);
        let (alpha, beta) = simple_ols(&y, &x).unwrap();
        let design = ndarray::Array2::from_shape_vec((x.len(), 1), x.clone()).unwrap();
        let full = crate::ols::OlsRegression::default()
            .fit(&ndarray::Array1::from(y), &design, &["Mkt-RF"])
            .unwrap();
        assert_relative_eq!(alpha, full.params[0], epsilon = 1e-10);
        assert_relative_eq!(beta, full.params[1], epsilon = 1e-10);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (y, x) = sample(0.01);
        let config = BootstrapConfig {
            n_iters: 200,
            seed: Some(7),
        };
        let a = bootstrap_alpha(&y, &x, &config).unwrap();
        let b = bootstrap_alpha(&y, &x, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nobs, 120);
        assert!((0.0..=1.0).contains(&a.p_value));
    }

    #[test]
    fn test_p_value_reflects_alpha_size() {
        let config = BootstrapConfig {
            n_iters: 300,
            seed: Some(1),
        };
        let (y, x) = sample(0.02);
        let strong = bootstrap_alpha(&y, &x, &config).unwrap();
        // resampled alphas centre on the estimate, so about half exceed it
        assert!(strong.p_value > 0.2 && strong.p_value < 0.8);
        assert_relative_eq!(strong.beta, 0.8, epsilon = 0.05);
    }

    #[test]
    fn test_invalid_inputs() {
        let config = BootstrapConfig::default();
        assert!(bootstrap_alpha(&[0.1, 0.2], &[0.1, 0.2], &config).is_err());
        assert!(bootstrap_alpha(&[0.1, 0.2, 0.3], &[0.1, 0.2], &config).is_err());
        assert!(bootstrap_alpha(&[0.1, 0.2, 0.3], &[0.0, 0.0, 0.0], &config).is_err());
        let zero = BootstrapConfig {
            n_iters: 0,
            ..Default::default()
        };
        assert!(bootstrap_alpha(&[0.1, 0.2, 0.3], &[0.1, 0.0, 0.2], &zero).is_err());
    }
}
