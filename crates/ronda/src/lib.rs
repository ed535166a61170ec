#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod reporting;
pub mod study;
pub mod universe;

// Re-export main types from sub-crates
pub use ronda_backtest as backtest;
pub use ronda_data as data;
pub use ronda_output as output;
pub use ronda_regression as regression;
pub use ronda_signals as signals;

pub use error::{Result, StudyError, UniverseError};
pub use study::{GROSS, NET, StrategyPerformance, Study, StudyConfig, strategy_series};
pub use universe::{HistoricalUniverse, StaticUniverse, Universe, eligibility};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
