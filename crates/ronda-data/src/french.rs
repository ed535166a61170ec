//! Fama–French factor data.
//!
//! The raw files published on Ken French's data library are CSV text with a
//! free-form preamble, a monthly block keyed by `YYYYMM` with values in
//! percent, and an annual block after a blank line. [`parse_french_csv`]
//! extracts the monthly block; [`FactorTable::from_french`] merges the
//! five-factor and momentum files into decimal returns.

use crate::calendar::{month_end, month_end_from_yyyymm, parse_date};
use crate::error::{DataError, Result, require_file};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Columns of a normalised factor table, in file order.
pub const FACTOR_COLUMNS: [&str; 7] = ["Mkt-RF", "SMB", "HML", "RMW", "CMA", "RF", "UMD"];

/// Header hints for locating the five-factor header line.
const FF5_HINTS: [&str; 6] = ["Mkt-RF", "SMB", "HML", "RMW", "CMA", "RF"];

/// Header hints for locating the momentum header line.
const UMD_HINTS: [&str; 2] = ["UMD", "Mom"];

/// Monthly block of a raw French file.
#[derive(Debug, Clone, PartialEq)]
pub struct FrenchBlock {
    /// Column names after the date column, trimmed
    pub columns: Vec<String>,
    /// Month-end date and raw (percent) values per row
    pub rows: Vec<(NaiveDate, Vec<f64>)>,
}

impl FrenchBlock {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn yyyymm_prefix(line: &str) -> Option<u32> {
    let trimmed = line.trim_start();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 6).then(|| digits.parse().ok()).flatten()
}

/// Decode Latin-1 bytes, the encoding of the French data files.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Extract the monthly block from raw French CSV text.
///
/// The block starts at the first line beginning with six digits. Its header
/// is the nearest of the ten lines above that mentions one of `header_hints`
/// (falling back to the line just above). The block ends at the first blank
/// line or at a line starting with "annual" or "yearly".
pub fn parse_french_csv(text: &str, header_hints: &[&str]) -> Result<FrenchBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| yyyymm_prefix(line).is_some())
        .ok_or_else(|| DataError::Parse("could not find start of monthly table (YYYYMM)".into()))?;

    let header_idx = (start.saturating_sub(10)..start)
        .rev()
        .find(|&i| {
            let lower = lines[i].to_lowercase();
            header_hints.iter().any(|h| lower.contains(&h.to_lowercase()))
        })
        .unwrap_or_else(|| start.saturating_sub(1));

    let columns: Vec<String> = lines
        .get(header_idx)
        .filter(|_| header_idx < start)
        .map(|line| line.split(',').skip(1).map(|h| h.trim().to_string()).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for (offset, line) in lines[start..].iter().enumerate() {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        if trimmed.is_empty() || lower.starts_with("annual") || lower.starts_with("yearly") {
            break;
        }
        let Some(yyyymm) = yyyymm_prefix(line) else {
            continue;
        };
        let date = month_end_from_yyyymm(yyyymm).ok_or_else(|| {
            DataError::Parse(format!("line {}: invalid month {yyyymm}", start + offset + 1))
        })?;
        let values = line
            .split(',')
            .skip(1)
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    DataError::Parse(format!(
                        "line {}: invalid value '{}'",
                        start + offset + 1,
                        v.trim()
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push((date, values));
    }

    if rows.is_empty() {
        return Err(DataError::Parse("monthly table is empty".into()));
    }
    Ok(FrenchBlock { columns, rows })
}

/// Monthly factor returns as decimals, keyed by month end.
#[derive(Debug, Clone)]
pub struct FactorTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FactorTable {
    /// Build a table, requiring one value per date and column.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (dates.len(), columns.len()) {
            return Err(DataError::Validation(format!(
                "factor values must be {}x{}, got {:?}",
                dates.len(),
                columns.len(),
                values.dim()
            )));
        }
        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Merge the raw five-factor and momentum files on month end.
    ///
    /// Only months present in both files are kept; percent values become
    /// decimals.
    pub fn from_french(ff5_text: &str, umd_text: &str) -> Result<Self> {
        let ff5 = parse_french_csv(ff5_text, &FF5_HINTS)?;
        let umd = parse_french_csv(umd_text, &UMD_HINTS)?;

        let ff5_idx = FF5_HINTS
            .iter()
            .map(|name| {
                ff5.column_index(name).ok_or_else(|| {
                    DataError::Validation(format!("five-factor file lacks column '{name}'"))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        let umd_idx = umd
            .columns
            .iter()
            .position(|c| {
                let lower = c.to_lowercase();
                lower.starts_with("umd") || lower.starts_with("mom")
            })
            .ok_or_else(|| DataError::Validation("momentum column not found".into()))?;

        let momentum: BTreeMap<NaiveDate, f64> = umd
            .rows
            .iter()
            .filter_map(|(date, values)| values.get(umd_idx).map(|v| (*date, *v)))
            .collect();

        let mut dates = Vec::new();
        let mut flat = Vec::new();
        for (date, values) in &ff5.rows {
            let Some(mom) = momentum.get(date) else {
                continue;
            };
            let mut row = Vec::with_capacity(FACTOR_COLUMNS.len());
            for &idx in &ff5_idx {
                let v = values.get(idx).ok_or_else(|| {
                    DataError::Parse(format!("{date}: short five-factor row"))
                })?;
                row.push(v / 100.0);
            }
            row.push(mom / 100.0);
            dates.push(*date);
            flat.extend(row);
        }

        let values = Array2::from_shape_vec((dates.len(), FACTOR_COLUMNS.len()), flat)
            .map_err(|e| DataError::Validation(e.to_string()))?;
        let columns = FACTOR_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        let table = Self::new(dates, columns, values)?;
        info!(months = table.len(), "merged Fama-French factors");
        Ok(table)
    }

    /// Read the raw French files from disk (Latin-1) and merge them.
    pub fn from_french_files<P: AsRef<Path>, Q: AsRef<Path>>(ff5: P, umd: Q) -> Result<Self> {
        let read = |path: &Path| -> Result<String> {
            require_file(path)?;
            Ok(decode_latin1(&std::fs::read(path)?))
        };
        Self::from_french(&read(ff5.as_ref())?, &read(umd.as_ref())?)
    }

    /// Load a normalised factor CSV with a `date` column and every column in
    /// [`FACTOR_COLUMNS`].
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        require_file(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| DataError::Parse(format!("{}: missing 'date' column", path.display())))?;
        let missing: Vec<&str> = FACTOR_COLUMNS
            .iter()
            .copied()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .collect();
        if !missing.is_empty() {
            return Err(DataError::Validation(format!(
                "missing factor columns in {}: {}",
                path.display(),
                missing.join(", ")
            )));
        }
        let column_idx: Vec<usize> = FACTOR_COLUMNS
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == *name))
            .collect();

        let mut rows: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let raw = record.get(date_idx).unwrap_or_default();
            let date = parse_date(raw)
                .map(month_end)
                .ok_or_else(|| DataError::Parse(format!("line {}: invalid date '{raw}'", i + 2)))?;
            let values = column_idx
                .iter()
                .map(|&idx| {
                    record
                        .get(idx)
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect();
            rows.insert(date, values);
        }

        let dates: Vec<NaiveDate> = rows.keys().copied().collect();
        let flat: Vec<f64> = rows.into_values().flatten().collect();
        let values = Array2::from_shape_vec((dates.len(), FACTOR_COLUMNS.len()), flat)
            .map_err(|e| DataError::Validation(e.to_string()))?;
        let columns = FACTOR_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        info!(path = %path.display(), months = dates.len(), "loaded factors");
        Self::new(dates, columns, values)
    }

    /// Write as `date,Mkt-RF,SMB,HML,RMW,CMA,RF,UMD`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["date".to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;
        for (i, date) in self.dates.iter().enumerate() {
            let mut row = vec![date.to_string()];
            row.extend(self.values.row(i).iter().map(|v| v.to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Month-end dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of months.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no months.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// All values of one factor.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(idx))
    }

    /// Row index for the month containing `date`.
    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&month_end(date)).ok()
    }

    /// Value of `name` in the month containing `date`.
    pub fn value(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let row = self.row_index(date)?;
        let col = self.columns.iter().position(|c| c == name)?;
        Some(self.values[[row, col]])
    }

    /// Total market return `Mkt-RF + RF` per month.
    pub fn market_return(&self) -> Vec<(NaiveDate, f64)> {
        match (self.column("Mkt-RF"), self.column("RF")) {
            (Some(mkt), Some(rf)) => self
                .dates
                .iter()
                .zip(mkt.iter().zip(rf.iter()))
                .map(|(date, (m, r))| (*date, m + r))
                .collect(),
            _ => Vec::new(),
        }
    }
}
