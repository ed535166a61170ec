#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod calendar;
pub mod error;
pub mod french;
pub mod membership;
pub mod prices;
pub mod returns;
pub mod series;
pub mod ticker;
pub mod yahoo;

pub use error::{DataError, Result};
pub use french::{FACTOR_COLUMNS, FactorTable};
pub use membership::{ConstituentRecord, MembershipChange};
pub use prices::{PricePanel, PricePoint};
pub use returns::ReturnCleaning;
pub use series::ReturnSeries;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
