//! Error types for the study pipeline.

use ronda_backtest::BacktestError;
use ronda_data::DataError;
use ronda_output::{ExportError, ReportError};
use ronda_regression::RegressionError;
use ronda_signals::SignalError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a universe.
#[derive(Debug, Error)]
pub enum UniverseError {
    /// Membership file does not exist
    #[error("Missing membership data: {}", path.display())]
    MissingData {
        /// Path that was looked up
        path: PathBuf,
    },

    /// No constituent records
    #[error("Universe is empty: {0}")]
    Empty(String),

    /// Loading or validating records failed
    #[error(transparent)]
    Data(DataError),
}

impl From<DataError> for UniverseError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::MissingFile { path } => Self::MissingData { path },
            other => Self::Data(other),
        }
    }
}

/// Result type for study operations.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors raised by the study pipeline.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Universe error
    #[error("Universe error: {0}")]
    Universe(#[from] UniverseError),

    /// Data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Signal error
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// Backtest error
    #[error("Backtest error: {0}")]
    Backtest(#[from] BacktestError),

    /// Regression error
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),

    /// Export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Report error
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Invalid study configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
