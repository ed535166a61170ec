//! Signal trait and per-month signal values.

use crate::error::Result;
use chrono::NaiveDate;
use ronda_data::PricePanel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Score of one ticker for one holding month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySignal {
    /// Ticker symbol
    pub ticker: String,
    /// Holding month (month end) the signal is used for
    pub as_of_month: NaiveDate,
    /// Trailing return over the formation window
    pub trailing_return: f64,
}

/// A signal that scores a cross-section of tickers month by month.
pub trait CrossSectionalSignal {
    /// Signal name, used in logs and reports.
    fn name(&self) -> &str;

    /// Months of price history required before the first scored month.
    fn min_history(&self) -> usize;

    /// Score the `eligible` tickers for the holding month at `month_idx`.
    ///
    /// Only information available at the end of the previous month may be
    /// used. Tickers without enough history are omitted from the result.
    fn score_month(
        &self,
        panel: &PricePanel,
        eligible: &BTreeSet<String>,
        month_idx: usize,
    ) -> Result<Vec<MonthlySignal>>;
}
