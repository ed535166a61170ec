//! Cross-sectional cleaning of monthly returns.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Return cleaning applied row by row (one row per month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnCleaning {
    /// Mask returns whose absolute log return exceeds `max_abs_log_return`.
    pub mask_extreme: bool,
    /// Threshold on `|ln(1 + r)|`.
    pub max_abs_log_return: f64,
    /// Clip each month's returns to its quantile band.
    pub winsorize: bool,
    /// Lower clipping quantile.
    pub lower_quantile: f64,
    /// Upper clipping quantile.
    pub upper_quantile: f64,
    /// Minimum valid returns in a month before it is winsorised.
    pub min_winsorize_count: usize,
}

impl Default for ReturnCleaning {
    fn default() -> Self {
        Self {
            mask_extreme: true,
            max_abs_log_return: 1.5,
            winsorize: true,
            lower_quantile: 0.01,
            upper_quantile: 0.99,
            min_winsorize_count: 50,
        }
    }
}

impl ReturnCleaning {
    /// No cleaning at all.
    pub const fn disabled() -> Self {
        Self {
            mask_extreme: false,
            max_abs_log_return: f64::INFINITY,
            winsorize: false,
            lower_quantile: 0.0,
            upper_quantile: 1.0,
            min_winsorize_count: usize::MAX,
        }
    }

    /// Clean `returns` in place and return the number of masked cells.
    pub fn apply(&self, returns: &mut Array2<f64>) -> usize {
        let mut masked = 0;
        for mut row in returns.rows_mut() {
            if self.mask_extreme {
                for r in row.iter_mut().filter(|r| !r.is_nan()) {
                    let log_move = r.ln_1p();
                    if log_move.is_nan() || log_move.abs() > self.max_abs_log_return {
                        *r = f64::NAN;
                        masked += 1;
                    }
                }
            }

            if self.winsorize {
                let mut valid: Vec<f64> = row.iter().copied().filter(|r| r.is_finite()).collect();
                if valid.len() >= self.min_winsorize_count && !valid.is_empty() {
                    valid.sort_by(f64::total_cmp);
                    let lo = quantile_sorted(&valid, self.lower_quantile);
                    let hi = quantile_sorted(&valid, self.upper_quantile);
                    for r in row.iter_mut().filter(|r| r.is_finite()) {
                        *r = r.clamp(lo, hi);
                    }
                }
            }
        }
        debug!(masked, "cleaned monthly returns");
        masked
    }
}

/// Linearly interpolated quantile of already sorted values.
///
/// `q` is clamped to `[0, 1]`. Returns `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Linearly interpolated quantile of the finite values in `values`.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.5, 2.5)]
    #[case(1.0, 4.0)]
    #[case(0.25, 1.75)]
    fn test_quantile(#[case] q: f64, #[case] expected: f64) {
        assert_relative_eq!(quantile(&[4.0, 1.0, f64::NAN, 3.0, 2.0], q), expected);
    }

    #[test]
    fn test_mask_extreme_moves() {
        let mut returns = array![[0.05, 4.0, -0.9, f64::NAN]];
        let cleaning = ReturnCleaning {
            winsorize: false,
            ..ReturnCleaning::default()
        };
        let masked = cleaning.apply(&mut returns);

        assert_eq!(masked, 2);
        assert_relative_eq!(returns[[0, 0]], 0.05);
        assert!(returns[[0, 1]].is_nan());
        assert!(returns[[0, 2]].is_nan());
        assert!(returns[[0, 3]].is_nan());
    }

    #[test]
    fn test_winsorize_only_large_cross_sections() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let mut returns = Array2::from_shape_vec((1, 100), values).unwrap();
        let cleaning = ReturnCleaning {
            mask_extreme: false,
            ..ReturnCleaning::default()
        };
        cleaning.apply(&mut returns);
        assert_relative_eq!(returns[[0, 0]], 0.0099, epsilon = 1e-12);
        assert_relative_eq!(returns[[0, 99]], 0.9801, epsilon = 1e-12);
        assert_relative_eq!(returns[[0, 50]], 0.5);

        let mut small = array![[-0.5, 0.0, 0.5]];
        cleaning.apply(&mut small);
        assert_relative_eq!(small[[0, 0]], -0.5);
    }

    #[test]
    fn test_disabled_is_identity() {
        let mut returns = array![[10.0, -0.99]];
        assert_eq!(ReturnCleaning::disabled().apply(&mut returns), 0);
        assert_relative_eq!(returns[[0, 0]], 10.0);
    }
}
