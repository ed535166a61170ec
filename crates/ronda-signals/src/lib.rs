#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod momentum;
pub mod rank;
pub mod signal;

pub use error::{Result, SignalError};
pub use momentum::{MomentumConfig, MomentumSignal};
pub use rank::{percentile_ranks, sort_descending};
pub use signal::{CrossSectionalSignal, MonthlySignal};
