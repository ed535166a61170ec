#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod covariance;
pub mod error;
pub mod linalg;
pub mod models;
pub mod normal;
pub mod ols;

// Re-export main types
pub use bootstrap::{BootstrapAlpha, BootstrapConfig, bootstrap_alpha, bootstrap_capm};
pub use covariance::{CovarianceEstimator, NeweyWestConfig, NeweyWestEstimator};
pub use error::{RegressionError, Result};
pub use models::{FactorModel, FactorRegression, annualize, regress, regress_all, stars};
pub use ols::{OlsConfig, OlsRegression, RegressionResult};
