//! Long-run covariance estimation
//!
//! Regression standard errors need the covariance of the score vectors
//! `x_t * u_t`, which are serially correlated in overlapping monthly returns.

pub mod newey_west;

pub use newey_west::{NeweyWestConfig, NeweyWestEstimator};

use crate::error::Result;
use ndarray::Array2;

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix of the rows of `observations`
    ///
    /// # Arguments
    /// * `observations` - Matrix where each row is a time period and each column a variable
    ///
    /// # Returns
    /// * Estimated covariance matrix (K x K where K is the number of columns)
    fn estimate(&self, observations: &Array2<f64>) -> Result<Array2<f64>>;
}
