//! Single-column monthly return series stored as `date,<name>` CSV files.

use crate::calendar::{month_end, parse_date};
use crate::error::{DataError, Result, require_file};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

/// A named monthly return series keyed by month end.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    /// Series label
    pub name: String,
    /// Month-end dates and returns, sorted by date
    pub points: Vec<(NaiveDate, f64)>,
}

impl ReturnSeries {
    /// Create a series, normalising dates to month ends and sorting them.
    /// Later duplicates of the same month win.
    pub fn new(name: impl Into<String>, points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let by_month: BTreeMap<NaiveDate, f64> = points
            .into_iter()
            .map(|(date, value)| (month_end(date), value))
            .collect();
        Self {
            name: name.into(),
            points: by_month.into_iter().collect(),
        }
    }

    /// Load the first value column of a CSV whose first column is a date.
    ///
    /// The series takes `name` when given, otherwise the column header.
    /// Empty or unparsable cells are skipped.
    pub fn load_csv<P: AsRef<Path>>(path: P, name: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        require_file(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = headers.get(1).ok_or_else(|| {
            DataError::Parse(format!("{}: expected a date column and a value column", path.display()))
        })?;
        let name = name.unwrap_or(column).to_string();

        let mut points = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let raw = record.get(0).unwrap_or_default();
            let date = parse_date(raw)
                .ok_or_else(|| DataError::Parse(format!("line {}: invalid date '{raw}'", i + 2)))?;
            if let Some(value) = record.get(1).and_then(|v| v.parse::<f64>().ok())
                && value.is_finite()
            {
                points.push((date, value));
            }
        }
        Ok(Self::new(name, points))
    }

    /// Month-end dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    /// Return values.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value in the month containing `date`.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let key = month_end(date);
        self.points
            .binary_search_by_key(&key, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Months present in both series, with the values of each.
    pub fn align(&self, other: &Self) -> Vec<(NaiveDate, f64, f64)> {
        self.points
            .iter()
            .filter_map(|(date, a)| other.get(*date).map(|b| (*date, *a, b)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_new_normalises_dates() {
        let series = ReturnSeries::new("s", vec![(d(2020, 2, 3), 0.02), (d(2020, 1, 31), 0.01)]);
        assert_eq!(series.dates(), vec![d(2020, 1, 31), d(2020, 2, 29)]);
        assert_eq!(series.get(d(2020, 2, 10)), Some(0.02));
        assert_eq!(series.get(d(2020, 3, 31)), None);
    }

    #[test]
    fn test_load_csv_uses_header_name() {
        let path = std::env::temp_dir().join("ronda_series.csv");
        std::fs::write(&path, "date,net\n2020-01-31,0.01\n2020-02-29,\n2020-03-31,-0.02\n").unwrap();

        let series = ReturnSeries::load_csv(&path, None).unwrap();
        assert_eq!(series.name, "net");
        assert_eq!(series.len(), 2);

        let renamed = ReturnSeries::load_csv(&path, Some("Strategy")).unwrap();
        assert_eq!(renamed.name, "Strategy");
    }

    #[test]
    fn test_align() {
        let a = ReturnSeries::new("a", vec![(d(2020, 1, 31), 0.01), (d(2020, 2, 29), 0.02)]);
        let b = ReturnSeries::new("b", vec![(d(2020, 2, 29), 0.05), (d(2020, 3, 31), 0.03)]);
        assert_eq!(a.align(&b), vec![(d(2020, 2, 29), 0.02, 0.05)]);
    }
}
