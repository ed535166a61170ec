//! Standard normal distribution helpers for large-sample inference.

use crate::error::Result;
use statrs::distribution::{ContinuousCDF, Normal};

/// The standard normal distribution `N(0, 1)`.
pub fn standard_normal() -> Result<Normal> {
    Ok(Normal::new(0.0, 1.0)?)
}

/// Two-sided p-value of a z statistic, `P(|Z| >= |z|)`.
///
/// Uses the survival function so deep tails do not round to zero.
pub fn two_sided_p_value(normal: &Normal, z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    (2.0 * normal.sf(z.abs())).clamp(0.0, 1.0)
}
