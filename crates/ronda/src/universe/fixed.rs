//! A constituent list that does not change over time.

use super::{HistoricalUniverse, Universe};
use chrono::NaiveDate;
use ronda_data::ticker::normalize_ticker;
use std::collections::BTreeSet;

/// The same members on every date.
///
/// Built from the constituents on the last date of a historical universe,
/// this is the survivorship-biased universe: firms that were dropped or
/// delisted before that date never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticUniverse {
    members: BTreeSet<String>,
}

impl StaticUniverse {
    /// Create a universe from ticker symbols.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            members: symbols
                .into_iter()
                .map(|s| normalize_ticker(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Freeze the members of `universe` on `date`.
    pub fn snapshot_of<U: Universe + ?Sized>(universe: &U, date: NaiveDate) -> Self {
        Self {
            members: universe.members_on(date),
        }
    }

    /// Freeze the final constituents of a historical universe.
    pub fn survivors(universe: &HistoricalUniverse) -> Self {
        universe
            .last_date()
            .map_or_else(Self::default, |date| Self::snapshot_of(universe, date))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the universe has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Universe for StaticUniverse {
    fn members_on(&self, _date: NaiveDate) -> BTreeSet<String> {
        self.members.clone()
    }

    fn symbols(&self) -> BTreeSet<String> {
        self.members.clone()
    }

    fn contains_on(&self, symbol: &str, _date: NaiveDate) -> bool {
        self.members.contains(symbol)
    }

    fn size_on(&self, _date: NaiveDate) -> usize {
        self.members.len()
    }
}
