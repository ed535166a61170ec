//! Error types for regression estimation.

use thiserror::Error;

/// Errors that can occur while fitting a regression.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Too few observations for the number of regressors
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// The design matrix is rank deficient
    #[error("Singular matrix: {0}")]
    Singular(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A factor the model needs is absent from the factor table
    #[error("Missing factor column: {0}")]
    MissingFactor(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid distribution parameters
    #[error("Distribution error: {0}")]
    Distribution(#[from] statrs::StatsError),
}

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;
