//! Month-end calendar helpers.
//!
//! Every monthly series in the study is keyed by the last calendar day of its
//! month, matching the Fama–French convention.

use chrono::{Datelike, NaiveDate};

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Month end of the month following `date`.
pub fn next_month_end(date: NaiveDate) -> NaiveDate {
    let end = month_end(date);
    end.succ_opt().map_or(end, month_end)
}

/// Month end of the month preceding `date`.
pub fn previous_month_end(date: NaiveDate) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    first.pred_opt().unwrap_or(first)
}

/// Contiguous month ends from the month of `start` through the month of `end`.
///
/// Empty when `start` falls in a later month than `end`.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let last = month_end(end);
    let mut current = month_end(start);
    let mut months = Vec::new();
    while current <= last {
        months.push(current);
        current = next_month_end(current);
    }
    months
}

/// Month end for a `YYYYMM` value, as used by the Ken French files.
pub fn month_end_from_yyyymm(value: u32) -> Option<NaiveDate> {
    let year = i32::try_from(value / 100).ok()?;
    let month = value % 100;
    NaiveDate::from_ymd_opt(year, month, 1).map(month_end)
}

/// Parse a date cell from an input CSV.
///
/// Accepts ISO dates, ISO timestamps (time part ignored), `YYYY/MM/DD`,
/// `YYYYMMDD` and `YYYY-MM` (mapped to the month end).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let head = s.split([' ', 'T']).next().unwrap_or(s);
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(head, fmt) {
            return Some(date);
        }
    }
    if head.len() == 8 && head.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(
            head[..4].parse().ok()?,
            head[4..6].parse().ok()?,
            head[6..].parse().ok()?,
        );
    }
    let (year, month) = head.split_once('-')?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1).map(month_end)
}

/// Number of whole months between the months of `from` and `to`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(d(2024, 1, 15), d(2024, 1, 31))]
    #[case(d(2024, 2, 1), d(2024, 2, 29))]
    #[case(d(2023, 2, 28), d(2023, 2, 28))]
    #[case(d(2023, 12, 5), d(2023, 12, 31))]
    fn test_month_end(#[case] input: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(month_end(input), expected);
    }

    #[test]
    fn test_next_and_previous() {
        assert_eq!(next_month_end(d(2023, 12, 31)), d(2024, 1, 31));
        assert_eq!(next_month_end(d(2024, 1, 31)), d(2024, 2, 29));
        assert_eq!(previous_month_end(d(2024, 3, 10)), d(2024, 2, 29));
        assert_eq!(previous_month_end(d(2024, 1, 31)), d(2023, 12, 31));
    }

    #[test]
    fn test_month_range() {
        let months = month_range(d(2023, 11, 3), d(2024, 2, 1));
        assert_eq!(
            months,
            vec![d(2023, 11, 30), d(2023, 12, 31), d(2024, 1, 31), d(2024, 2, 29)]
        );
        assert!(month_range(d(2024, 3, 1), d(2024, 2, 1)).is_empty());
    }

    #[test]
    fn test_yyyymm() {
        assert_eq!(month_end_from_yyyymm(196307), Some(d(1963, 7, 31)));
        assert_eq!(month_end_from_yyyymm(202413), None);
        assert_eq!(months_between(d(2023, 11, 30), d(2024, 2, 29)), 3);
    }

    #[rstest]
    #[case("2024-01-31", Some(d(2024, 1, 31)))]
    #[case("2024-01-31 00:00:00", Some(d(2024, 1, 31)))]
    #[case("2024-01-31T00:00:00Z", Some(d(2024, 1, 31)))]
    #[case("2024/01/31", Some(d(2024, 1, 31)))]
    #[case("20240131", Some(d(2024, 1, 31)))]
    #[case("2024-02", Some(d(2024, 2, 29)))]
    #[case("not a date", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(raw), expected);
    }
}
