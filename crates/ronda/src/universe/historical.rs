//! Point-in-time index membership.

use super::Universe;
use crate::error::UniverseError;
use chrono::NaiveDate;
use ronda_data::ConstituentRecord;
use ronda_data::membership::{self, MembershipChange};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

type Result<T> = std::result::Result<T, UniverseError>;

/// Universe built from dated membership intervals.
#[derive(Debug, Clone)]
pub struct HistoricalUniverse {
    records: Vec<ConstituentRecord>,
    by_ticker: BTreeMap<String, Vec<(NaiveDate, Option<NaiveDate>)>>,
}

impl HistoricalUniverse {
    /// Build from membership records, validating each.
    pub fn from_records(mut records: Vec<ConstituentRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(UniverseError::Empty("no membership records".to_string()));
        }
        for record in &records {
            record.validate()?;
        }
        records.sort();

        let mut by_ticker: BTreeMap<String, Vec<(NaiveDate, Option<NaiveDate>)>> = BTreeMap::new();
        for record in &records {
            by_ticker
                .entry(record.ticker.clone())
                .or_default()
                .push((record.entry_date, record.exit_date));
        }
        Ok(Self { records, by_ticker })
    }

    /// Load a membership CSV in interval or monthly panel form.
    ///
    /// # Errors
    /// [`UniverseError::MissingData`] when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let universe = Self::from_records(membership::load_records(path)?)?;
        info!(
            tickers = universe.by_ticker.len(),
            records = universe.records.len(),
            "built historical universe"
        );
        Ok(universe)
    }

    /// Rebuild membership from the current constituents and a change log,
    /// covering `start` to `end`.
    pub fn from_change_log(
        current: &BTreeSet<String>,
        changes: &[MembershipChange],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self> {
        Self::from_records(membership::reconstruct_intervals(current, changes, start, end)?)
    }

    /// Load the current constituent list and change log from CSV files and
    /// rebuild membership from them.
    pub fn load_change_log<P: AsRef<Path>, Q: AsRef<Path>>(
        current: P,
        changes: Q,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self> {
        let current = membership::load_current(current)?;
        let changes = membership::load_changes(changes)?;
        Self::from_change_log(&current, &changes, start, end)
    }

    /// Membership records sorted by ticker and entry date.
    pub fn records(&self) -> &[ConstituentRecord] {
        &self.records
    }

    /// Every ticker that was ever a member.
    pub fn union(&self) -> BTreeSet<String> {
        self.by_ticker.keys().cloned().collect()
    }

    /// Earliest entry date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.entry_date).min()
    }

    /// Latest entry or exit date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .map(|r| r.exit_date.unwrap_or(r.entry_date))
            .max()
    }

    /// Write the records in interval form.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        membership::write_records(path, &self.records)?;
        Ok(())
    }
}

impl Universe for HistoricalUniverse {
    fn members_on(&self, date: NaiveDate) -> BTreeSet<String> {
        self.by_ticker
            .iter()
            .filter(|(_, stints)| {
                stints
                    .iter()
                    .any(|(entry, exit)| *entry <= date && exit.is_none_or(|x| x > date))
            })
            .map(|(ticker, _)| ticker.clone())
            .collect()
    }

    fn symbols(&self) -> BTreeSet<String> {
        self.union()
    }

    fn contains_on(&self, symbol: &str, date: NaiveDate) -> bool {
        self.by_ticker.get(symbol).is_some_and(|stints| {
            stints
                .iter()
                .any(|(entry, exit)| *entry <= date && exit.is_none_or(|x| x > date))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ronda_data::calendar::{month_range, next_month_end};
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn universe() -> HistoricalUniverse {
        HistoricalUniverse::from_records(vec![
            ConstituentRecord::new("AAA", date(1995, 1, 1), None).unwrap(),
            ConstituentRecord::new("BBB", date(1995, 1, 1), Some(date(2001, 3, 15))).unwrap(),
            ConstituentRecord::new("BBB", date(2004, 7, 1), None).unwrap(),
            ConstituentRecord::new("CCC", date(2000, 6, 30), Some(date(2002, 1, 1))).unwrap(),
        ])
        .unwrap()
    }

    #[rstest]
    #[case(date(1994, 12, 31), &[])]
    #[case(date(1995, 1, 1), &["AAA", "BBB"])]
    #[case(date(2000, 6, 30), &["AAA", "BBB", "CCC"])]
    #[case(date(2001, 3, 15), &["AAA", "CCC"])]
    #[case(date(2003, 1, 31), &["AAA"])]
    #[case(date(2004, 7, 1), &["AAA", "BBB"])]
    fn test_members_on(#[case] on: NaiveDate, #[case] expected: &[&str]) {
        let members: Vec<String> = universe().members_on(on).into_iter().collect();
        assert_eq!(members, expected);
    }

    #[test]
    fn test_exited_tickers_never_returned() {
        let universe = universe();
        let mut month = date(1995, 1, 31);
        while month <= date(2006, 12, 31) {
            let members = universe.members_on(month);
            for record in universe.records() {
                if let Some(exit) = record.exit_date
                    && exit <= month
                    && !universe
                        .records()
                        .iter()
                        .any(|r| r.ticker == record.ticker && r.is_member_on(month))
                {
                    assert!(!members.contains(&record.ticker), "{} on {month}", record.ticker);
                }
            }
            month = next_month_end(month);
        }
    }

    #[test]
    fn test_union_and_bounds() {
        let universe = universe();
        let union: Vec<String> = universe.union().into_iter().collect();
        assert_eq!(union, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(universe.symbols().len(), 3);
        assert_eq!(universe.first_date(), Some(date(1995, 1, 1)));
        assert_eq!(universe.last_date(), Some(date(2004, 7, 1)));
        assert_eq!(universe.records().len(), 4);
    }

    #[test]
    fn test_contains_matches_members_on() {
        let universe = universe();
        for month in month_range(date(1995, 1, 1), date(2006, 1, 1)) {
            let members = universe.members_on(month);
            for ticker in universe.union() {
                assert_eq!(universe.contains_on(&ticker, month), members.contains(&ticker));
            }
        }
    }

    #[test]
    fn test_change_log_reconstruction() {
        let current: BTreeSet<String> = ["AAA", "DDD"].iter().map(|s| s.to_string()).collect();
        let changes = vec![
            MembershipChange {
                date: date(1985, 5, 1),
                added: vec!["ZZZ".to_string()],
                removed: vec![],
            },
            MembershipChange {
                date: date(2005, 3, 1),
                added: vec!["DDD".to_string()],
                removed: vec!["BBB".to_string()],
            },
        ];
        let universe =
            HistoricalUniverse::from_change_log(&current, &changes, date(2000, 1, 1), date(2010, 1, 1)).unwrap();

        assert_eq!(
            universe.members_on(date(2004, 12, 31)).into_iter().collect::<Vec<_>>(),
            vec!["AAA", "BBB"]
        );
        assert_eq!(
            universe.members_on(date(2005, 3, 31)).into_iter().collect::<Vec<_>>(),
            vec!["AAA", "DDD"]
        );
        // events before 1990 are ignored
        assert!(!universe.union().contains("ZZZ"));
    }

    #[test]
    fn test_missing_file_is_missing_data() {
        let path = std::env::temp_dir().join("ronda_no_such_membership.csv");
        assert!(matches!(
            HistoricalUniverse::load(&path),
            Err(UniverseError::MissingData { .. })
        ));
    }

    #[test]
    fn test_empty_records_rejected() {
        assert!(matches!(
            HistoricalUniverse::from_records(vec![]),
            Err(UniverseError::Empty(_))
        ));
    }

    #[test]
    fn test_load_and_write_round_trip_intervals() {
        let dir = std::env::temp_dir().join("ronda_universe_load_test");
        std::fs::create_dir_all(&dir).unwrap();
        let panel = dir.join("panel.csv");
        std::fs::write(
            &panel,
            "date,ticker,in_index\n2000-01-31,AAA,1\n2000-02-29,AAA,1\n2000-01-31,BRK.B,1\n2000-02-29,BRK.B,0\n",
        )
        .unwrap();
        let universe = HistoricalUniverse::load(&panel).unwrap();
        assert!(universe.contains_on("BRK-B", date(2000, 1, 31)));
        assert!(!universe.contains_on("BRK-B", date(2000, 2, 29)));
        assert!(universe.contains_on("AAA", date(2000, 2, 29)));
        assert!(!universe.contains_on("AAA", date(2000, 3, 1)));

        let intervals = dir.join("intervals.csv");
        universe.write(&intervals).unwrap();
        let reloaded = HistoricalUniverse::load(&intervals).unwrap();
        assert_eq!(reloaded.records(), universe.records());
        std::fs::remove_dir_all(&dir).ok();
    }
}
