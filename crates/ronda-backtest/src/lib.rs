#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cost;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod sensitivity;

pub use cost::CostModel;
pub use engine::{Backtest, BacktestConfig, BacktestResult, MonthRecord};
pub use error::{BacktestError, Result};
pub use metrics::{PerformanceConfig, PerformanceSummary, TurnoverStats};
pub use portfolio::{PortfolioConfig, PortfolioConstructor, PortfolioMode, PortfolioSnapshot, Selection};
pub use sensitivity::{
    CostSensitivityRow, DEFAULT_COST_GRID_BPS, DEFAULT_LOOKBACKS, LookbackRow, cost_grid, lookback_grid,
};
