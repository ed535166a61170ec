//! Point-in-time index membership records.
//!
//! Membership is stored as half-open intervals `[entry_date, exit_date)`. A
//! ticker that left and later re-joined the index carries one record per
//! stint.
//!
//! Three input forms are supported:
//! - interval CSV: `ticker,entry_date,exit_date` (exit empty while a member);
//! - monthly panel CSV: `date,ticker,in_index`, one row per month and member;
//! - change log: the current constituents plus dated add/remove events, rolled
//!   back to a start date and replayed forward ([`reconstruct_intervals`]).

use crate::calendar::{months_between, parse_date};
use crate::error::{DataError, Result, require_file};
use crate::ticker::normalize_ticker;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Change-log events dated before this are ignored.
pub const EARLIEST_EVENT_YEAR: i32 = 1990;

/// One membership stint of a ticker in the index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstituentRecord {
    /// Ticker, normalised for the quote provider
    pub ticker: String,
    /// First date the ticker is a member
    pub entry_date: NaiveDate,
    /// First date the ticker is no longer a member
    pub exit_date: Option<NaiveDate>,
}

impl ConstituentRecord {
    /// Create a validated record.
    pub fn new(ticker: &str, entry_date: NaiveDate, exit_date: Option<NaiveDate>) -> Result<Self> {
        let record = Self {
            ticker: normalize_ticker(ticker),
            entry_date,
            exit_date,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record invariants: non-empty ticker and exit after entry.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(DataError::Validation("empty ticker".to_string()));
        }
        if let Some(exit) = self.exit_date
            && exit <= self.entry_date
        {
            return Err(DataError::Validation(format!(
                "{}: exit date {} is not after entry date {}",
                self.ticker, exit, self.entry_date
            )));
        }
        Ok(())
    }

    /// Whether the ticker is an index member on `date`.
    pub fn is_member_on(&self, date: NaiveDate) -> bool {
        self.entry_date <= date && self.exit_date.is_none_or(|exit| exit > date)
    }
}

/// A dated batch of index additions and removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    /// Effective date of the change
    pub date: NaiveDate,
    /// Tickers added to the index
    pub added: Vec<String>,
    /// Tickers removed from the index
    pub removed: Vec<String>,
}

impl MembershipChange {
    /// Whether the event changes nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    require_file(path)?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?)
}

fn header_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn required_column(headers: &csv::StringRecord, names: &[&str], path: &Path) -> Result<usize> {
    header_index(headers, names).ok_or_else(|| {
        DataError::Parse(format!(
            "{}: missing column '{}'",
            path.display(),
            names.first().copied().unwrap_or_default()
        ))
    })
}

fn date_cell(record: &csv::StringRecord, idx: usize, line: usize) -> Result<NaiveDate> {
    let raw = record.get(idx).unwrap_or_default();
    parse_date(raw).ok_or_else(|| DataError::Parse(format!("line {line}: invalid date '{raw}'")))
}

/// Load membership records from a CSV file in interval or panel form.
///
/// The form is detected from the header: an `entry_date` column selects the
/// interval form, an `in_index` column (or bare `date,ticker`) the panel form.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<ConstituentRecord>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();

    let records = if header_index(&headers, &["entry_date", "start_date"]).is_some() {
        load_interval_rows(&mut reader, &headers, path)?
    } else {
        let months = load_panel_rows(&mut reader, &headers, path)?;
        intervals_from_panel(&months)
    };

    info!(
        path = %path.display(),
        records = records.len(),
        "loaded index membership"
    );
    Ok(records)
}

fn load_interval_rows(
    reader: &mut csv::Reader<std::fs::File>,
    headers: &csv::StringRecord,
    path: &Path,
) -> Result<Vec<ConstituentRecord>> {
    let ticker_idx = required_column(headers, &["ticker", "symbol"], path)?;
    let entry_idx = required_column(headers, &["entry_date", "start_date"], path)?;
    let exit_idx = header_index(headers, &["exit_date", "end_date"]);

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let entry = date_cell(&row, entry_idx, line)?;
        let exit = match exit_idx {
            Some(idx) if !row.get(idx).unwrap_or_default().is_empty() => {
                Some(date_cell(&row, idx, line)?)
            }
            _ => None,
        };
        let ticker = row.get(ticker_idx).unwrap_or_default();
        let record = ConstituentRecord::new(ticker, entry, exit)
            .map_err(|e| DataError::Validation(format!("{}:{line}: {e}", path.display())))?;
        records.push(record);
    }
    records.sort();
    Ok(records)
}

fn load_panel_rows(
    reader: &mut csv::Reader<std::fs::File>,
    headers: &csv::StringRecord,
    path: &Path,
) -> Result<BTreeMap<String, BTreeSet<NaiveDate>>> {
    let date_idx = required_column(headers, &["date", "month"], path)?;
    let ticker_idx = required_column(headers, &["ticker", "symbol"], path)?;
    let flag_idx = header_index(headers, &["in_index"]);

    let mut months: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        if let Some(idx) = flag_idx {
            let flag: f64 = row
                .get(idx)
                .unwrap_or_default()
                .parse()
                .map_err(|_| DataError::Parse(format!("line {line}: invalid in_index value")))?;
            if flag <= 0.5 {
                continue;
            }
        }
        let ticker = normalize_ticker(row.get(ticker_idx).unwrap_or_default());
        if ticker.is_empty() {
            continue;
        }
        let date = date_cell(&row, date_idx, line)?;
        months.entry(ticker).or_default().insert(date);
    }
    Ok(months)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    crate::calendar::month_end(date).succ_opt().unwrap_or(date)
}

/// Merge per-ticker member months into membership intervals.
///
/// Consecutive months form one interval running from the first day of the
/// first month to the first day of the month after the last one. A gap of a
/// month or more starts a new interval.
pub fn intervals_from_panel(months: &BTreeMap<String, BTreeSet<NaiveDate>>) -> Vec<ConstituentRecord> {
    let mut records = Vec::new();
    for (ticker, dates) in months {
        let mut iter = dates.iter().copied();
        let Some(first) = iter.next() else { continue };
        let (mut start, mut last) = (first, first);
        for date in iter {
            if months_between(last, date) > 1 {
                records.push(ConstituentRecord {
                    ticker: ticker.clone(),
                    entry_date: first_of_month(start),
                    exit_date: Some(first_of_next_month(last)),
                });
                start = date;
            }
            last = date;
        }
        records.push(ConstituentRecord {
            ticker: ticker.clone(),
            entry_date: first_of_month(start),
            exit_date: Some(first_of_next_month(last)),
        });
    }
    records.sort();
    records
}

/// Load the current constituent list: one ticker per row, first column.
pub fn load_current<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let idx = header_index(&headers, &["ticker", "symbol"]).unwrap_or(0);

    let mut tickers = BTreeSet::new();
    for row in reader.records() {
        let ticker = normalize_ticker(row?.get(idx).unwrap_or_default());
        if !ticker.is_empty() {
            tickers.insert(ticker);
        }
    }
    Ok(tickers)
}

/// Load a change log with columns `date,added,removed`.
///
/// Several tickers in one cell are separated by `;`. Events without any
/// ticker are dropped.
pub fn load_changes<P: AsRef<Path>>(path: P) -> Result<Vec<MembershipChange>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let date_idx = required_column(&headers, &["date"], path)?;
    let added_idx = header_index(&headers, &["added"]);
    let removed_idx = header_index(&headers, &["removed"]);

    let split = |cell: Option<&str>| -> Vec<String> {
        cell.unwrap_or_default()
            .split(';')
            .map(normalize_ticker)
            .filter(|t| !t.is_empty())
            .collect()
    };

    let mut changes = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let change = MembershipChange {
            date: date_cell(&row, date_idx, i + 2)?,
            added: split(added_idx.and_then(|idx| row.get(idx))),
            removed: split(removed_idx.and_then(|idx| row.get(idx))),
        };
        if !change.is_empty() {
            changes.push(change);
        }
    }
    changes.sort_by_key(|c| c.date);
    Ok(changes)
}

/// Rebuild membership intervals from the current constituents and a change log.
///
/// Every event dated after `start` is undone in reverse order to recover the
/// constituents on `start`. Events in `(start, end]` are then replayed in
/// date order, closing an interval on removal and opening one on addition.
/// Intervals still open after `end` keep an empty exit date.
pub fn reconstruct_intervals(
    current: &BTreeSet<String>,
    changes: &[MembershipChange],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ConstituentRecord>> {
    if start > end {
        return Err(DataError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let mut events: Vec<&MembershipChange> = changes
        .iter()
        .filter(|c| c.date.year() >= EARLIEST_EVENT_YEAR && !c.is_empty())
        .collect();
    events.sort_by_key(|c| c.date);

    let mut members = current.clone();
    for event in events.iter().rev().filter(|e| e.date > start) {
        for added in &event.added {
            members.remove(added);
        }
        for removed in &event.removed {
            members.insert(removed.clone());
        }
    }
    debug!(members = members.len(), %start, "rolled back membership");

    let mut open: BTreeMap<String, NaiveDate> =
        members.into_iter().map(|t| (t, start)).collect();
    let mut records = Vec::new();

    for event in events.iter().filter(|e| e.date > start && e.date <= end) {
        for removed in &event.removed {
            if let Some(entry) = open.remove(removed)
                && entry < event.date
            {
                records.push(ConstituentRecord {
                    ticker: removed.clone(),
                    entry_date: entry,
                    exit_date: Some(event.date),
                });
            }
        }
        for added in &event.added {
            open.entry(added.clone()).or_insert(event.date);
        }
    }

    records.extend(open.into_iter().map(|(ticker, entry)| ConstituentRecord {
        ticker,
        entry_date: entry,
        exit_date: None,
    }));
    records.sort();
    Ok(records)
}

/// Write records in interval form.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[ConstituentRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ticker", "entry_date", "exit_date"])?;
    for record in records {
        writer.write_record([
            record.ticker.clone(),
            record.entry_date.to_string(),
            record.exit_date.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
