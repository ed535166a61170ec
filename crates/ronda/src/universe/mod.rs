//! Index universes.
//!
//! A universe answers which tickers belong to the index on a given date.
//! [`HistoricalUniverse`] uses point-in-time membership and is the
//! survivorship-free universe of the study. [`StaticUniverse`] applies one
//! fixed constituent list to every date; built from the final membership it
//! reproduces the survivorship-biased setup for comparison.

pub mod fixed;
pub mod historical;

pub use fixed::StaticUniverse;
pub use historical::HistoricalUniverse;

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Trait for stock universes.
pub trait Universe {
    /// Index members on `date`, sorted.
    fn members_on(&self, date: NaiveDate) -> BTreeSet<String>;

    /// Every ticker that is a member on some date.
    fn symbols(&self) -> BTreeSet<String>;

    /// Check if a symbol is a member on `date`.
    fn contains_on(&self, symbol: &str, date: NaiveDate) -> bool {
        self.members_on(date).contains(symbol)
    }

    /// Get the number of constituents on `date`.
    fn size_on(&self, date: NaiveDate) -> usize {
        self.members_on(date).len()
    }
}

/// Tickers that may be held in each month of `months`.
///
/// Holding month `t` uses the membership on the formation date
/// `months[t - 1]`; the first month has no formation date and is empty.
pub fn eligibility<U: Universe + ?Sized>(universe: &U, months: &[NaiveDate]) -> Vec<BTreeSet<String>> {
    std::iter::once(BTreeSet::new())
        .chain(months.windows(2).map(|w| universe.members_on(w[0])))
        .take(months.len())
        .collect()
}
