//! Month-end price panels.
//!
//! A [`PricePanel`] holds two aligned `months × tickers` matrices:
//! - `close`: the last adjusted close observed in each calendar month;
//! - `signal_close`: the close used for signal formation, taken a fixed number
//!   of trading days before the month's last observation.
//!
//! Missing cells are `NaN`. Non-positive prices are treated as missing.

use crate::calendar::{month_end, month_range, parse_date};
use crate::error::{DataError, Result, require_file};
use crate::ticker::normalize_ticker;
use chrono::NaiveDate;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// One adjusted close observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Ticker symbol
    pub ticker: String,
    /// Observation date
    pub date: NaiveDate,
    /// Split and dividend adjusted close
    pub adjusted_close: f64,
}

/// Month-end price matrices over a contiguous range of months.
#[derive(Debug, Clone)]
pub struct PricePanel {
    months: Vec<NaiveDate>,
    tickers: Vec<String>,
    close: Array2<f64>,
    signal_close: Array2<f64>,
}

impl PricePanel {
    /// Build a panel from raw observations.
    ///
    /// A ticker is daily when it has more than one observation in some
    /// calendar month; its signal close then lags the month's last
    /// observation by `signal_lag_days` trading days of its own series.
    /// A ticker with month-end observations only uses the month-end close as
    /// signal close.
    pub fn from_points(points: &[PricePoint], signal_lag_days: usize) -> Result<Self> {
        let mut by_ticker: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for point in points {
            if point.adjusted_close.is_finite() && point.adjusted_close > 0.0 {
                by_ticker
                    .entry(point.ticker.clone())
                    .or_default()
                    .push((point.date, point.adjusted_close));
            }
        }
        if by_ticker.is_empty() {
            return Err(DataError::MissingData {
                symbol: "prices".to_string(),
                reason: "no positive prices in input".to_string(),
            });
        }

        for series in by_ticker.values_mut() {
            series.sort_by_key(|(date, _)| *date);
            series.dedup_by_key(|(date, _)| *date);
        }

        let first = by_ticker
            .values()
            .filter_map(|series| series.first().map(|(date, _)| *date))
            .min();
        let last = by_ticker
            .values()
            .filter_map(|series| series.last().map(|(date, _)| *date))
            .max();
        let (Some(first), Some(last)) = (first, last) else {
            return Err(DataError::MissingData {
                symbol: "prices".to_string(),
                reason: "no dated observations".to_string(),
            });
        };

        let months = month_range(first, last);
        let month_pos: HashMap<NaiveDate, usize> =
            months.iter().enumerate().map(|(i, m)| (*m, i)).collect();
        let tickers: Vec<String> = by_ticker.keys().cloned().collect();

        let mut close = Array2::from_elem((months.len(), tickers.len()), f64::NAN);
        let mut signal_close = close.clone();

        let mut daily_tickers = 0;
        for (j, series) in by_ticker.values().enumerate() {
            let daily = is_daily(series);
            daily_tickers += usize::from(daily);
            for (k, (date, price)) in series.iter().enumerate() {
                let is_month_last = series
                    .get(k + 1)
                    .is_none_or(|(next, _)| month_end(*next) != month_end(*date));
                if !is_month_last {
                    continue;
                }
                let Some(&i) = month_pos.get(&month_end(*date)) else {
                    continue;
                };
                close[[i, j]] = *price;
                signal_close[[i, j]] = if daily {
                    k.checked_sub(signal_lag_days)
                        .and_then(|lagged| series.get(lagged))
                        .map_or(f64::NAN, |(_, p)| *p)
                } else {
                    *price
                };
            }
        }

        debug!(
            months = months.len(),
            tickers = tickers.len(),
            daily_tickers,
            "built price panel"
        );
        Ok(Self {
            months,
            tickers,
            close,
            signal_close,
        })
    }

    /// Build a panel directly from month-end matrices.
    pub fn from_matrices(
        months: Vec<NaiveDate>,
        tickers: Vec<String>,
        close: Array2<f64>,
        signal_close: Array2<f64>,
    ) -> Result<Self> {
        let shape = (months.len(), tickers.len());
        if close.dim() != shape || signal_close.dim() != shape {
            return Err(DataError::Validation(format!(
                "price matrices must be {}x{}, got {:?} and {:?}",
                shape.0,
                shape.1,
                close.dim(),
                signal_close.dim()
            )));
        }
        if !tickers.windows(2).all(|w| w[0] < w[1]) || !months.windows(2).all(|w| w[0] < w[1]) {
            return Err(DataError::Validation(
                "months and tickers must be strictly increasing".to_string(),
            ));
        }
        let clean = |m: Array2<f64>| m.mapv(|p| if p.is_finite() && p > 0.0 { p } else { f64::NAN });
        Ok(Self {
            months,
            tickers,
            close: clean(close),
            signal_close: clean(signal_close),
        })
    }

    /// Load prices from CSV, detecting long (`ticker,date,adjusted_close`) or
    /// wide (`date,<TICKER>,...`) form from the header.
    pub fn load_csv<P: AsRef<Path>>(path: P, signal_lag_days: usize) -> Result<Self> {
        let path = path.as_ref();
        let points = load_points(path)?;
        let panel = Self::from_points(&points, signal_lag_days)?;
        info!(
            path = %path.display(),
            observations = points.len(),
            months = panel.n_months(),
            tickers = panel.n_tickers(),
            "loaded prices"
        );
        Ok(panel)
    }

    /// Month-end dates, one per row.
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Tickers, one per column, sorted.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Month-end closes.
    pub const fn close(&self) -> &Array2<f64> {
        &self.close
    }

    /// Closes used for signal formation.
    pub const fn signal_close(&self) -> &Array2<f64> {
        &self.signal_close
    }

    /// Number of months.
    pub fn n_months(&self) -> usize {
        self.months.len()
    }

    /// Number of tickers.
    pub fn n_tickers(&self) -> usize {
        self.tickers.len()
    }

    /// Column index of a ticker.
    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.binary_search_by(|t| t.as_str().cmp(ticker)).ok()
    }

    /// Row index of the month containing `date`.
    pub fn month_index(&self, date: NaiveDate) -> Option<usize> {
        self.months.binary_search(&month_end(date)).ok()
    }

    /// Simple monthly returns `close(t) / close(t-1) - 1`; row 0 and any
    /// month without both closes are `NaN`.
    pub fn monthly_returns(&self) -> Array2<f64> {
        let mut returns = Array2::from_elem(self.close.dim(), f64::NAN);
        for i in 1..self.months.len() {
            for j in 0..self.tickers.len() {
                let (prev, cur) = (self.close[[i - 1, j]], self.close[[i, j]]);
                if prev.is_finite() && cur.is_finite() {
                    returns[[i, j]] = cur / prev - 1.0;
                }
            }
        }
        returns
    }

    /// Write month-end closes in wide form.
    pub fn write_wide_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["date".to_string()];
        header.extend(self.tickers.iter().cloned());
        writer.write_record(&header)?;
        for (i, month) in self.months.iter().enumerate() {
            let mut row = vec![month.to_string()];
            row.extend(self.close.row(i).iter().map(|p| {
                if p.is_finite() {
                    p.to_string()
                } else {
                    String::new()
                }
            }));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Whether a ticker's series has more than one observation in some month.
fn is_daily(series: &[(NaiveDate, f64)]) -> bool {
    series
        .windows(2)
        .any(|w| month_end(w[0].0) == month_end(w[1].0))
}

/// Read price observations from a long or wide CSV file.
pub fn load_points<P: AsRef<Path>>(path: P) -> Result<Vec<PricePoint>> {
    let path = path.as_ref();
    require_file(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let date_idx = find(&["date"]).ok_or_else(|| {
        DataError::Parse(format!("{}: missing 'date' column", path.display()))
    })?;

    let mut points = Vec::new();
    if let Some(ticker_idx) = find(&["ticker", "symbol"]) {
        let price_idx = find(&["adjusted_close", "adj_close", "close"]).ok_or_else(|| {
            DataError::Parse(format!("{}: missing 'adjusted_close' column", path.display()))
        })?;
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let raw_date = row.get(date_idx).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| {
                DataError::Parse(format!("line {}: invalid date '{raw_date}'", i + 2))
            })?;
            if let Some(price) = parse_price(row.get(price_idx)) {
                points.push(PricePoint {
                    ticker: normalize_ticker(row.get(ticker_idx).unwrap_or_default()),
                    date,
                    adjusted_close: price,
                });
            }
        }
    } else {
        let columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != date_idx && !name.is_empty())
            .map(|(idx, name)| (idx, normalize_ticker(name)))
            .collect();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let raw_date = row.get(date_idx).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| {
                DataError::Parse(format!("line {}: invalid date '{raw_date}'", i + 2))
            })?;
            for (idx, ticker) in &columns {
                if let Some(price) = parse_price(row.get(*idx)) {
                    points.push(PricePoint {
                        ticker: ticker.clone(),
                        date,
                        adjusted_close: price,
                    });
                }
            }
        }
    }
    Ok(points)
}

fn parse_price(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|c| c.parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

/// Write observations in long form `ticker,date,adjusted_close`.
pub fn write_points<P: AsRef<Path>>(path: P, points: &[PricePoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ticker", "date", "adjusted_close"])?;
    for point in points {
        writer.write_record([
            point.ticker.clone(),
            point.date.to_string(),
            point.adjusted_close.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Convert a quotes DataFrame (`symbol`, `date`, `adjusted_close`) into
/// observations.
pub fn points_from_quotes(df: &DataFrame) -> Result<Vec<PricePoint>> {
    let symbols = df.column("symbol")?.str()?;
    let dates = df.column("date")?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let closes = df.column("adjusted_close")?.f64()?;

    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(symbol), Some(date), Some(close)) = (symbols.get(i), dates.get(i), closes.get(i))
        else {
            continue;
        };
        let date = parse_date(date)
            .ok_or_else(|| DataError::Parse(format!("invalid quote date '{date}'")))?;
        points.push(PricePoint {
            ticker: symbol.to_string(),
            date,
            adjusted_close: close,
        });
    }
    Ok(points)
}
