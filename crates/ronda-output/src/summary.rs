//! Summary statistics and factor regression tables.
//!
//! Tables render to plain text for the console, Markdown for documentation,
//! LaTeX for papers and CSV for further analysis.

use crate::export::{ExportError, ExportFormat, Exporter, RegressionRow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `12.34%`, or `-` when the value is missing.
fn pct(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}%", decimals, value * 100.0)
    } else {
        "-".to_string()
    }
}

/// Fixed-point number, or `-` when the value is missing.
fn num(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        "-".to_string()
    }
}

fn latex_escape(text: &str) -> String {
    text.replace('\\', r"\textbackslash{}")
        .replace('%', r"\%")
        .replace('&', r"\&")
        .replace('_', r"\_")
        .replace('#', r"\#")
}

/// Performance statistics for one monthly return series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRow {
    /// Series label, e.g. `Strategy (net)`.
    pub series: String,

    /// Number of monthly observations.
    pub n: usize,

    /// Mean monthly return.
    pub mean: f64,

    /// Monthly volatility.
    pub vol: f64,

    /// Annualised Sharpe ratio of excess returns.
    pub sharpe: f64,

    /// Annualised return.
    pub ann_return: f64,

    /// Annualised volatility.
    pub ann_vol: f64,

    /// Sample skewness.
    pub skew: f64,

    /// Excess kurtosis.
    pub kurtosis: f64,

    /// Maximum drawdown (non-positive).
    pub max_drawdown: f64,

    /// Mean monthly turnover, for strategy series.
    pub turnover_mean: Option<f64>,

    /// Median monthly turnover.
    pub turnover_median: Option<f64>,

    /// 95th percentile of monthly turnover.
    pub turnover_p95: Option<f64>,
}

impl fmt::Display for PerformanceRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ann return {}, ann vol {}, Sharpe {}, max DD {}",
            self.series,
            pct(self.ann_return, 2),
            pct(self.ann_vol, 2),
            num(self.sharpe, 2),
            pct(self.max_drawdown, 2)
        )
    }
}

/// Summary statistics for several series side by side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryTable {
    /// Table title.
    pub title: String,

    /// One row per series.
    pub rows: Vec<PerformanceRow>,
}

impl SummaryTable {
    /// Create a table.
    pub fn new(title: impl Into<String>, rows: Vec<PerformanceRow>) -> Self {
        Self {
            title: title.into(),
            rows,
        }
    }

    /// Look up a row by series label.
    pub fn row(&self, series: &str) -> Option<&PerformanceRow> {
        self.rows.iter().find(|r| r.series == series)
    }

    fn has_turnover(&self) -> bool {
        self.rows.iter().any(|r| r.turnover_mean.is_some())
    }

    /// Format as ASCII table for console output.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&"=".repeat(110));
        output.push('\n');
        output.push_str(&format!("{}\n", self.title));
        output.push_str(&"=".repeat(110));
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:>5} {:>9} {:>9} {:>7} {:>9} {:>9} {:>7} {:>8} {:>9}\n",
            "Series", "N", "Mean (m)", "Vol (m)", "Sharpe", "Ann Ret", "Ann Vol", "Skew", "Kurt", "Max DD"
        ));
        output.push_str(&"-".repeat(110));
        output.push('\n');

        for row in &self.rows {
            output.push_str(&format!(
                "{:<20} {:>5} {:>9} {:>9} {:>7} {:>9} {:>9} {:>7} {:>8} {:>9}\n",
                row.series,
                row.n,
                pct(row.mean, 3),
                pct(row.vol, 3),
                num(row.sharpe, 2),
                pct(row.ann_return, 2),
                pct(row.ann_vol, 2),
                num(row.skew, 2),
                num(row.kurtosis, 2),
                pct(row.max_drawdown, 2)
            ));
        }

        if self.has_turnover() {
            output.push('\n');
            output.push_str(&format!(
                "{:<20} {:>12} {:>12} {:>12}\n",
                "Turnover", "Mean", "Median", "95th pct"
            ));
            output.push_str(&"-".repeat(59));
            output.push('\n');
            for row in &self.rows {
                if let (Some(mean), Some(median), Some(p95)) =
                    (row.turnover_mean, row.turnover_median, row.turnover_p95)
                {
                    output.push_str(&format!(
                        "{:<20} {:>12} {:>12} {:>12}\n",
                        row.series,
                        pct(mean, 1),
                        pct(median, 1),
                        pct(p95, 1)
                    ));
                }
            }
        }

        output.push_str(&"=".repeat(110));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.title));
        output.push_str(
            "| Series | N | Mean (m) | Vol (m) | Sharpe | Ann Ret | Ann Vol | Skew | Kurtosis | Max DD |\n",
        );
        output.push_str(
            "|--------|---|----------|---------|--------|---------|---------|------|----------|--------|\n",
        );
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                row.series,
                row.n,
                pct(row.mean, 3),
                pct(row.vol, 3),
                num(row.sharpe, 2),
                pct(row.ann_return, 2),
                pct(row.ann_vol, 2),
                num(row.skew, 2),
                num(row.kurtosis, 2),
                pct(row.max_drawdown, 2)
            ));
        }

        output
    }

    /// Format as a LaTeX `table` environment with booktabs rules.
    pub fn to_latex(&self) -> String {
        let mut lines = vec![
            r"\begin{table}[!ht]".to_string(),
            r"\centering".to_string(),
            format!(r"\caption{{{}}}", latex_escape(&self.title)),
            r"\label{tab:summary_stats}".to_string(),
            r"\begin{tabular}{lrrrrrrrrr}".to_string(),
            r"\toprule".to_string(),
            r"Series & $N$ & Mean (m) & Vol (m) & Sharpe & Ann Ret & Ann Vol & Skew & Kurtosis & Max DD \\"
                .to_string(),
            r"\midrule".to_string(),
        ];
        for row in &self.rows {
            let cells = [
                row.series.clone(),
                row.n.to_string(),
                pct(row.mean, 3),
                pct(row.vol, 3),
                num(row.sharpe, 2),
                pct(row.ann_return, 2),
                pct(row.ann_vol, 2),
                num(row.skew, 2),
                num(row.kurtosis, 2),
                pct(row.max_drawdown, 2),
            ];
            let cells: Vec<String> = cells.iter().map(|c| latex_escape(c)).collect();
            lines.push(format!(r"{} \\", cells.join(" & ")));
        }
        lines.extend(
            [r"\bottomrule", r"\end{tabular}", r"\end{table}", ""]
                .iter()
                .map(|s| s.to_string()),
        );
        lines.join("\n")
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

impl Exporter for SummaryTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for row in &self.rows {
                    wtr.serialize(row)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Factor regression results for one or more series.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegressionTable {
    /// Newey-West lags used for the standard errors.
    pub lags: usize,

    /// Rows in series-major order.
    pub rows: Vec<RegressionRow>,
}

impl RegressionTable {
    /// Create a table.
    pub const fn new(lags: usize, rows: Vec<RegressionRow>) -> Self {
        Self { lags, rows }
    }

    /// Distinct series labels in first-seen order.
    pub fn series(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.series.as_str()) {
                out.push(&row.series);
            }
        }
        out
    }

    /// `α(ann)= 4.91%  t= 2.10 **  R²= 0.120  n=240`.
    fn console_line(row: &RegressionRow) -> String {
        format!(
            "{:<8} α(ann)={:>8}  t={:>6}{:<3}  R²={:>6}  n={}",
            row.model,
            pct(row.alpha_annual, 2),
            num(row.alpha_t, 2),
            row.stars,
            num(row.r_squared, 3),
            row.nobs
        )
    }

    /// Format as ASCII blocks, one per series.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!("FACTOR REGRESSIONS (HAC {} lags)\n", self.lags));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        for series in self.series() {
            output.push_str(&format!("\n=== {series} ===\n"));
            for row in self.rows.iter().filter(|r| r.series == series) {
                output.push_str(&Self::console_line(row));
                output.push('\n');
                let loadings: Vec<String> = row
                    .loadings
                    .iter()
                    .map(|l| format!("{}={} ({})", l.factor, num(l.beta, 2), num(l.t_value, 2)))
                    .collect();
                if !loadings.is_empty() {
                    output.push_str(&format!("         {}\n", loadings.join("  ")));
                }
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Factor Regressions (HAC {} lags)\n\n", self.lags));
        output.push_str("| Series | Model | α (monthly) | α (annual) | t | p | R² | N |\n");
        output.push_str("|--------|-------|-------------|------------|---|---|----|---|\n");
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {} | {}{} | {} | {} | {} | {} |\n",
                row.series,
                row.model,
                pct(row.alpha_monthly, 3),
                pct(row.alpha_annual, 2),
                row.stars,
                num(row.alpha_t, 2),
                num(row.alpha_p, 3),
                num(row.r_squared, 3),
                row.nobs
            ));
        }

        output
    }

    /// LaTeX table of one series: annual alpha with its t-statistic, R² and N
    /// per model. `None` when the series has no rows.
    pub fn to_latex(&self, series: &str) -> Option<String> {
        let rows: Vec<&RegressionRow> = self.rows.iter().filter(|r| r.series == series).collect();
        if rows.is_empty() {
            return None;
        }

        let mut lines = vec![
            r"\begin{table}[!ht]".to_string(),
            r"\centering".to_string(),
            format!(
                r"\caption{{Factor Regressions ({} returns; HAC {} lags)}}",
                latex_escape(&series.to_uppercase()),
                self.lags
            ),
            r"\label{tab:ff_regressions}".to_string(),
            r"\begin{tabular}{lccc}".to_string(),
            r"\toprule".to_string(),
            r"Model & $\alpha$ (annual) [t] & $R^2$ & $n$ \\".to_string(),
            r"\midrule".to_string(),
        ];
        for row in rows {
            lines.push(format!(
                r"{} & {} ({}) & {} & {} \\",
                latex_escape(&row.model),
                latex_escape(&pct(row.alpha_annual, 2)),
                num(row.alpha_t, 2),
                num(row.r_squared, 2),
                row.nobs
            ));
        }
        lines.extend(
            [r"\bottomrule", r"\end{tabular}", r"\end{table}", ""]
                .iter()
                .map(|s| s.to_string()),
        );
        Some(lines.join("\n"))
    }
}

impl fmt::Display for RegressionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

impl Exporter for RegressionTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.rows.export_to_string(format)
    }
}
