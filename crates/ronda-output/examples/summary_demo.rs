//! Demonstration of the summary table and cost grid exports in ronda-output.

use ronda_output::{CostSensitivityExport, ExportFormat, Exporter, PerformanceRow, SummaryTable};

fn row(series: &str, mean: f64, vol: f64, max_drawdown: f64, turnover: Option<f64>) -> PerformanceRow {
    PerformanceRow {
        series: series.to_string(),
        n: 360,
        mean,
        vol,
        sharpe: (mean - 0.02 / 12.0) / vol * 12f64.sqrt(),
        ann_return: (1.0 + mean).powi(12) - 1.0,
        ann_vol: vol * 12f64.sqrt(),
        skew: -0.6,
        kurtosis: 4.1,
        max_drawdown,
        turnover_mean: turnover,
        turnover_median: turnover.map(|t| t * 0.95),
        turnover_p95: turnover.map(|t| t * 1.6),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ronda Summary Demo ===\n");

    let summary = SummaryTable::new(
        "Summary statistics (monthly, decimal returns)",
        vec![
            row("Strategy (gross)", 0.0081, 0.052, -0.58, Some(0.42)),
            row("Strategy (net)", 0.0072, 0.052, -0.61, Some(0.42)),
            row("US Market", 0.0093, 0.044, -0.51, None),
        ],
    );

    println!("{}", summary.to_ascii_table());
    println!("Markdown:\n\n{}", summary.to_markdown());
    println!("LaTeX:\n\n{}", summary.to_latex());

    // Net performance as the per-side cost rises
    let grid: Vec<CostSensitivityExport> = [0.0, 5.0, 10.0, 25.0, 50.0]
        .iter()
        .map(|&cost_bps| {
            let drag = 0.42 * 2.0 * cost_bps / 10_000.0 * 12.0;
            CostSensitivityExport {
                cost_bps,
                ann_return: 0.102 - drag,
                ann_vol: 0.18,
                sharpe: (0.102 - drag - 0.02) / 0.18,
                max_drawdown: -0.58 - drag,
            }
        })
        .collect();

    println!("Cost sensitivity (CSV):\n\n{}", grid.export_to_string(ExportFormat::Csv)?);

    Ok(())
}
