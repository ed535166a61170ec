//! Error types for signal computation.

use thiserror::Error;

/// Result type for signal operations.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors raised while configuring or computing signals.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Invalid signal configuration
    #[error("Invalid signal configuration: {0}")]
    InvalidConfig(String),

    /// Month index outside the price panel
    #[error("Month index {index} is outside a panel of {months} months")]
    MonthOutOfRange {
        /// Requested month index
        index: usize,
        /// Months in the panel
        months: usize,
    },
}
