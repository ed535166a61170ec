//! Small dense linear algebra helpers.

use crate::error::{RegressionError, Result};
use ndarray::Array2;

/// Pivots below this fraction of the largest diagonal entry count as zero.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-12;

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Fails with [`RegressionError::Singular`] when a pivot vanishes relative to
/// the scale of the matrix.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if n == 0 || scale == 0.0 || !scale.is_finite() {
        return Err(RegressionError::Singular(format!(
            "{n}x{n} matrix has no usable entries"
        )));
    }
    let tolerance = scale * RELATIVE_PIVOT_TOLERANCE;

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        let pivot = a[[pivot_row, col]];
        if pivot.abs() <= tolerance {
            return Err(RegressionError::Singular(format!(
                "pivot {pivot:.3e} in column {col}"
            )));
        }

        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
                inv.swap([col, k], [pivot_row, k]);
            }
        }

        for k in 0..n {
            a[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                let (da, dinv) = (factor * a[[col, k]], factor * inv[[col, k]]);
                a[[row, k]] -= da;
                inv[[row, k]] -= dinv;
            }
        }
    }
    Ok(inv)
}
