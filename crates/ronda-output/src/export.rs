//! CSV and JSON export of study results.
//!
//! Every exported table is a flat list of rows. Series exports carry one
//! `date,value` row per month and back the figure data (wealth curves,
//! drawdowns, rolling Sharpe).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(format!(
                "unsupported extension {other:?} for {}",
                path.display()
            ))),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn writer_into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn rows_to_string<T: Serialize>(rows: &[T], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for row in rows {
                wtr.serialize(row)?;
            }
            writer_into_string(wtr)
        }
        ExportFormat::Json => Ok(serde_json::to_string(rows)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(rows)?),
    }
}

fn cell(value: f64) -> String {
    if value.is_finite() { value.to_string() } else { String::new() }
}

/// A single observation of a dated series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    /// Month-end date.
    pub date: NaiveDate,

    /// Value on that date.
    pub value: f64,
}

/// A named monthly series such as net returns or a wealth curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesExport {
    /// Series label.
    pub name: String,

    /// Observations in date order.
    pub points: Vec<SeriesPoint>,
}

impl SeriesExport {
    /// Pair dates with values; the shorter input decides the length.
    pub fn new(name: impl Into<String>, dates: &[NaiveDate], values: &[f64]) -> Self {
        Self {
            name: name.into(),
            points: dates
                .iter()
                .zip(values)
                .map(|(&date, &value)| SeriesPoint { date, value })
                .collect(),
        }
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Exporter for SeriesExport {
    /// CSV output is `date,value`; non-finite values are left blank.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["date", "value"])?;
                for point in &self.points {
                    wtr.write_record([point.date.to_string(), cell(point.value)])?;
                }
                writer_into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// One month of a backtest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRecordExport {
    /// Holding month (month-end date).
    pub month: NaiveDate,

    /// Return before costs.
    pub gross_return: f64,

    /// Sum of absolute weight changes.
    pub turnover: f64,

    /// Transaction cost charged.
    pub cost: f64,

    /// Return after costs.
    pub net_return: f64,

    /// Names held long.
    pub n_long: usize,

    /// Names held short.
    pub n_short: usize,
}

impl Exporter for Vec<MonthlyRecordExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        rows_to_string(self, format)
    }
}

/// A position held during one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingExport {
    /// Holding month.
    pub month: NaiveDate,

    /// Ticker symbol.
    pub ticker: String,

    /// Portfolio weight, negative for shorts.
    pub weight: f64,
}

impl HoldingExport {
    /// Create a new holding row.
    pub const fn new(month: NaiveDate, ticker: String, weight: f64) -> Self {
        Self {
            month,
            ticker,
            weight,
        }
    }

    /// `long` or `short`.
    pub const fn side(&self) -> &'static str {
        if self.weight < 0.0 { "short" } else { "long" }
    }
}

impl Exporter for Vec<HoldingExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["month", "ticker", "side", "weight"])?;
                for holding in self {
                    wtr.write_record([
                        holding.month.to_string(),
                        holding.ticker.clone(),
                        holding.side().to_string(),
                        holding.weight.to_string(),
                    ])?;
                }
                writer_into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// A factor loading with its t-statistic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadingExport {
    /// Factor column name.
    pub factor: String,

    /// Estimated loading.
    pub beta: f64,

    /// HAC t-statistic.
    pub t_value: f64,
}

/// One (series, model) factor regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionRow {
    /// Strategy series label.
    pub series: String,

    /// Model name, e.g. `FF5+UMD`.
    pub model: String,

    /// Monthly alpha.
    pub alpha_monthly: f64,

    /// Annualised alpha.
    pub alpha_annual: f64,

    /// Alpha t-statistic.
    pub alpha_t: f64,

    /// Alpha p-value.
    pub alpha_p: f64,

    /// Significance stars for the alpha.
    pub stars: String,

    /// R².
    pub r_squared: f64,

    /// Observations used.
    pub nobs: usize,

    /// Factor loadings in model order.
    pub loadings: Vec<LoadingExport>,
}

impl Exporter for Vec<RegressionRow> {
    /// CSV output has one `beta_<factor>` and `t_<factor>` column per factor
    /// seen in any row; factors a model does not use are left blank.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut factors: Vec<&str> = Vec::new();
                let mut seen = BTreeSet::new();
                for loading in self.iter().flat_map(|r| &r.loadings) {
                    if seen.insert(loading.factor.as_str()) {
                        factors.push(&loading.factor);
                    }
                }

                let mut header: Vec<String> = [
                    "Series", "Model", "Alpha_m", "Alpha_ann", "Alpha_t", "Alpha_p", "R2", "N",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect();
                for factor in &factors {
                    header.push(format!("beta_{factor}"));
                    header.push(format!("t_{factor}"));
                }

                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(&header)?;
                for row in self {
                    let mut record = vec![
                        row.series.clone(),
                        row.model.clone(),
                        cell(row.alpha_monthly),
                        cell(row.alpha_annual),
                        cell(row.alpha_t),
                        cell(row.alpha_p),
                        cell(row.r_squared),
                        row.nobs.to_string(),
                    ];
                    for factor in &factors {
                        match row.loadings.iter().find(|l| l.factor == *factor) {
                            Some(l) => {
                                record.push(cell(l.beta));
                                record.push(cell(l.t_value));
                            }
                            None => record.extend([String::new(), String::new()]),
                        }
                    }
                    wtr.write_record(&record)?;
                }
                writer_into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Performance of the same backtest under one cost assumption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostSensitivityExport {
    /// Per-side cost in basis points.
    pub cost_bps: f64,

    /// Annualised net return.
    pub ann_return: f64,

    /// Annualised volatility.
    pub ann_vol: f64,

    /// Annualised Sharpe ratio.
    pub sharpe: f64,

    /// Maximum drawdown.
    pub max_drawdown: f64,
}

impl Exporter for Vec<CostSensitivityExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        rows_to_string(self, format)
    }
}

/// Performance of the strategy under one lookback window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookbackExport {
    /// Lookback in months.
    pub lookback: usize,

    /// Months traded.
    pub months: usize,

    /// Mean monthly turnover.
    pub mean_turnover: f64,

    /// Annualised net return.
    pub ann_return: f64,

    /// Annualised Sharpe ratio.
    pub sharpe: f64,

    /// Maximum drawdown.
    pub max_drawdown: f64,
}

impl Exporter for Vec<LookbackExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        rows_to_string(self, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn regression_rows() -> Vec<RegressionRow> {
        let loading = |factor: &str, beta: f64, t_value: f64| LoadingExport {
            factor: factor.to_string(),
            beta,
            t_value,
        };
        vec![
            RegressionRow {
                series: "NET".to_string(),
                model: "CAPM".to_string(),
                alpha_monthly: 0.004,
                alpha_annual: 0.049,
                alpha_t: 2.1,
                alpha_p: 0.036,
                stars: "**".to_string(),
                r_squared: 0.12,
                nobs: 240,
                loadings: vec![loading("Mkt-RF", -0.3, -4.0)],
            },
            RegressionRow {
                series: "NET".to_string(),
                model: "FF3".to_string(),
                alpha_monthly: 0.003,
                alpha_annual: 0.037,
                alpha_t: 1.7,
                alpha_p: 0.09,
                stars: "*".to_string(),
                r_squared: 0.2,
                nobs: 240,
                loadings: vec![
                    loading("Mkt-RF", -0.25, -3.5),
                    loading("SMB", 0.1, 1.0),
                    loading("HML", f64::NAN, f64::NAN),
                ],
            },
        ]
    }

    #[test]
    fn test_series_export_csv() {
        let series = SeriesExport::new(
            "wealth",
            &[date(2020, 1, 31), date(2020, 2, 29)],
            &[1.01, f64::NAN],
        );
        assert_eq!(series.len(), 2);

        let csv = series.export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["date,value", "2020-01-31,1.01", "2020-02-29,"]);
    }

    #[test]
    fn test_series_export_json() {
        let series = SeriesExport::new("net", &[date(2020, 1, 31)], &[0.02]);
        let json = series.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\"net\""));
        assert!(json.contains("2020-01-31"));
        assert!(json.contains("  ")); // Indentation indicates pretty format
    }

    #[test]
    fn test_monthly_records_csv() {
        let records = vec![MonthlyRecordExport {
            month: date(2021, 3, 31),
            gross_return: 0.02,
            turnover: 1.0,
            cost: 0.001,
            net_return: 0.019,
            n_long: 50,
            n_short: 50,
        }];
        let csv = records.export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("month,gross_return,turnover,cost,net_return,n_long,n_short")
        );
        assert_eq!(lines.next(), Some("2021-03-31,0.02,1.0,0.001,0.019,50,50"));
    }

    #[test]
    fn test_holdings_csv_has_side() {
        let holdings = vec![
            HoldingExport::new(date(2021, 3, 31), "AAA".to_string(), 0.5),
            HoldingExport::new(date(2021, 3, 31), "BBB".to_string(), -0.5),
        ];
        let csv = holdings.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("month,ticker,side,weight\n"));
        assert!(csv.contains("AAA,long,0.5"));
        assert!(csv.contains("BBB,short,-0.5"));
    }

    #[test]
    fn test_regression_csv_columns() {
        let csv = regression_rows().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Series,Model,Alpha_m,Alpha_ann,Alpha_t,Alpha_p,R2,N,beta_Mkt-RF,t_Mkt-RF,beta_SMB,t_SMB,beta_HML,t_HML"
        );
        // CAPM leaves SMB and HML blank
        assert!(lines[1].ends_with("-0.3,-4,,,,"));
        assert!(lines[2].starts_with("NET,FF3,0.003"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_regression_json() {
        let json = regression_rows().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"model\":\"FF3\""));
        assert!(json.contains("\"loadings\""));
    }

    #[test]
    fn test_sensitivity_csv() {
        let rows = vec![CostSensitivityExport {
            cost_bps: 25.0,
            ann_return: 0.05,
            ann_vol: 0.15,
            sharpe: 0.2,
            max_drawdown: -0.3,
        }];
        let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("cost_bps,ann_return,ann_vol,sharpe,max_drawdown\n"));

        let rows = vec![LookbackExport {
            lookback: 6,
            months: 120,
            mean_turnover: 0.8,
            ann_return: 0.04,
            sharpe: 0.1,
            max_drawdown: -0.4,
        }];
        let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.contains("6,120,0.8"));
    }

    #[test]
    fn test_export_to_file_creates_parent() {
        let dir = std::env::temp_dir().join("ronda_output_export_test");
        let path = dir.join("nested").join("net.csv");
        let series = SeriesExport::new("net", &[date(2020, 1, 31)], &[0.01]);
        series.export_to_file(&path, ExportFormat::Csv).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("2020-01-31,0.01"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.csv")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("r.json")).unwrap().extension(), "json");
        assert!(ExportFormat::from_path(Path::new("r.txt")).is_err());
    }
}
