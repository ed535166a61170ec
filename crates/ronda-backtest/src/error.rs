//! Error types for backtesting.

use ronda_signals::SignalError;
use thiserror::Error;

/// Result type for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;

/// Errors raised while configuring or running a backtest.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Signal computation failed
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// Invalid configuration
    #[error("Invalid backtest configuration: {0}")]
    InvalidConfig(String),

    /// Inputs disagree in length or shape
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: String,
        /// Actual size
        actual: String,
    },

    /// No month can be traded
    #[error("No tradable months: {0}")]
    NoPeriods(String),
}
