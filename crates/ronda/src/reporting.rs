//! Conversion of study results into report tables and series exports.

use ronda_backtest::metrics::{cumulative_wealth, drawdown_series, rolling_sharpe};
use ronda_backtest::{
    BacktestResult, CostSensitivityRow, LookbackRow, PerformanceConfig, PerformanceSummary,
    TurnoverStats,
};
use ronda_data::{FactorTable, ReturnSeries};
use ronda_output::{
    CostSensitivityExport, HoldingExport, LoadingExport, LookbackExport, MonthlyRecordExport,
    PerformanceRow, RegressionRow, RegressionTable, SeriesExport, SummaryTable,
};
use ronda_regression::FactorRegression;

/// Label of the benchmark row built from the factor table.
pub const MARKET_LABEL: &str = "US Market";

/// Title used for performance tables.
pub const SUMMARY_TITLE: &str = "Summary statistics (monthly, decimal returns)";

/// Performance row for a return series, with turnover statistics when given.
pub fn performance_row(
    label: &str,
    returns: &[f64],
    turnover: Option<&[f64]>,
    config: &PerformanceConfig,
) -> PerformanceRow {
    let summary = PerformanceSummary::from_returns(returns, config);
    let turnover = turnover.map(TurnoverStats::from_turnover);
    PerformanceRow {
        series: label.to_string(),
        n: summary.n,
        mean: summary.mean,
        vol: summary.vol,
        sharpe: summary.sharpe,
        ann_return: summary.ann_return,
        ann_vol: summary.ann_vol,
        skew: summary.skew,
        kurtosis: summary.kurtosis,
        max_drawdown: summary.max_drawdown,
        turnover_mean: turnover.map(|t| t.mean),
        turnover_median: turnover.map(|t| t.median),
        turnover_p95: turnover.map(|t| t.p95),
    }
}

/// The total market return (`Mkt-RF + RF`) as a series.
pub fn market_series(factors: &FactorTable) -> ReturnSeries {
    ReturnSeries::new(MARKET_LABEL, factors.market_return())
}

/// Summary of a strategy series and the market over the months both cover.
pub fn summary_against_market(
    label: &str,
    strategy: &ReturnSeries,
    factors: &FactorTable,
    config: &PerformanceConfig,
) -> SummaryTable {
    let aligned = strategy.align(&market_series(factors));
    let ours: Vec<f64> = aligned.iter().map(|(_, s, _)| *s).collect();
    let market: Vec<f64> = aligned.iter().map(|(_, _, m)| *m).collect();
    SummaryTable::new(
        SUMMARY_TITLE,
        vec![
            performance_row(label, &ours, None, config),
            performance_row(MARKET_LABEL, &market, None, config),
        ],
    )
}

/// Gross and net rows of a backtest, plus the market when factors are given.
pub fn backtest_summary(
    result: &BacktestResult,
    factors: Option<&FactorTable>,
    config: &PerformanceConfig,
) -> SummaryTable {
    let turnover = result.turnover();
    let mut rows = vec![
        performance_row("Strategy (gross)", &result.gross_returns(), Some(turnover.as_slice()), config),
        performance_row("Strategy (net)", &result.net_returns(), Some(turnover.as_slice()), config),
    ];
    if let Some(factors) = factors {
        let market = market_series(factors);
        let values: Vec<f64> = result
            .months()
            .iter()
            .filter_map(|m| market.get(*m))
            .collect();
        if !values.is_empty() {
            rows.push(performance_row(MARKET_LABEL, &values, None, config));
        }
    }
    SummaryTable::new(SUMMARY_TITLE, rows)
}

/// One export row per backtest month.
pub fn monthly_records(result: &BacktestResult) -> Vec<MonthlyRecordExport> {
    result
        .records()
        .iter()
        .map(|r| MonthlyRecordExport {
            month: r.month,
            gross_return: r.gross_return,
            turnover: r.turnover,
            cost: r.cost,
            net_return: r.net_return,
            n_long: r.n_long,
            n_short: r.n_short,
        })
        .collect()
}

/// One export row per position per month.
pub fn holdings(result: &BacktestResult) -> Vec<HoldingExport> {
    result
        .snapshots()
        .iter()
        .flat_map(|s| {
            s.weights
                .iter()
                .map(|(ticker, weight)| HoldingExport::new(s.month, ticker.clone(), *weight))
        })
        .collect()
}

/// Figure data for a return series: wealth curve, drawdowns and rolling
/// Sharpe, named `wealth_<name>`, `drawdown_<name>` and `rolling_sharpe_<name>`.
pub fn figure_series(series: &ReturnSeries, config: &PerformanceConfig) -> Vec<SeriesExport> {
    let dates = series.dates();
    let values = series.values();
    let name = series.name.to_lowercase();
    vec![
        SeriesExport::new(format!("wealth_{name}"), &dates, &cumulative_wealth(&values)),
        SeriesExport::new(format!("drawdown_{name}"), &dates, &drawdown_series(&values)),
        SeriesExport::new(format!("rolling_sharpe_{name}"), &dates, &rolling_sharpe(&values, config)),
    ]
}

/// A return series as an export.
pub fn returns_export(series: &ReturnSeries) -> SeriesExport {
    SeriesExport::new(series.name.to_lowercase(), &series.dates(), &series.values())
}

/// One regression row per fitted (series, model).
pub fn regression_rows(fits: &[FactorRegression]) -> Vec<RegressionRow> {
    fits.iter()
        .map(|fit| RegressionRow {
            series: fit.series.clone(),
            model: fit.model.name().to_string(),
            alpha_monthly: fit.alpha_monthly(),
            alpha_annual: fit.alpha_annual(),
            alpha_t: fit.alpha_t(),
            alpha_p: fit.alpha_p(),
            stars: fit.alpha_stars().to_string(),
            r_squared: fit.r_squared(),
            nobs: fit.nobs(),
            loadings: fit
                .model
                .factors()
                .iter()
                .map(|factor| LoadingExport {
                    factor: (*factor).to_string(),
                    beta: fit.beta(factor).unwrap_or(f64::NAN),
                    t_value: fit.beta_t(factor).unwrap_or(f64::NAN),
                })
                .collect(),
        })
        .collect()
}

/// Regression table; the lag count is read from the fits.
pub fn regression_table(fits: &[FactorRegression]) -> RegressionTable {
    let lags = fits.first().map_or(0, |f| f.result.lags);
    RegressionTable::new(lags, regression_rows(fits))
}

/// Export rows of the cost grid.
pub fn cost_rows(rows: &[CostSensitivityRow]) -> Vec<CostSensitivityExport> {
    rows.iter()
        .map(|r| CostSensitivityExport {
            cost_bps: r.cost_bps,
            ann_return: r.summary.ann_return,
            ann_vol: r.summary.ann_vol,
            sharpe: r.summary.sharpe,
            max_drawdown: r.summary.max_drawdown,
        })
        .collect()
}

/// Export rows of the lookback grid.
pub fn lookback_rows(rows: &[LookbackRow]) -> Vec<LookbackExport> {
    rows.iter()
        .map(|r| LookbackExport {
            lookback: r.lookback,
            months: r.months,
            mean_turnover: r.mean_turnover,
            ann_return: r.summary.ann_return,
            sharpe: r.summary.sharpe,
            max_drawdown: r.summary.max_drawdown,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::Array2;
    use ronda_data::calendar::next_month_end;
    use ronda_regression::{FactorModel, OlsConfig, regress};

    fn months(n: usize) -> Vec<NaiveDate> {
        let mut out = vec![NaiveDate::from_ymd_opt(2015, 1, 31).unwrap()];
        while out.len() < n {
            let last = *out.last().unwrap();
            out.push(next_month_end(last));
        }
        out
    }

    fn factors(n: usize) -> FactorTable {
        let columns: Vec<String> = ronda_data::FACTOR_COLUMNS.iter().map(|c| c.to_string()).collect();
        let values = Array2::from_shape_fn((n, columns.len()), |(t, j)| match columns[j].as_str() {
            "RF" => 0.001,
            _ => 0.02 * ((t as f64 + 1.0) * (j as f64 + 0.7)).sin(),
        });
        FactorTable::new(months(n), columns, values).unwrap()
    }

    #[test]
    fn test_performance_row_turnover() {
        let config = PerformanceConfig::default();
        let row = performance_row("Strategy (net)", &[0.01, -0.02, 0.03], Some(&[1.0, 0.5, 0.7][..]), &config);
        assert_eq!(row.n, 3);
        assert_relative_eq!(row.mean, 0.02 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(row.turnover_mean.unwrap(), 2.2 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(row.turnover_median.unwrap(), 0.7);

        let row = performance_row("US Market", &[0.01], None, &config);
        assert!(row.turnover_p95.is_none());
    }

    #[test]
    fn test_summary_against_market_aligns() {
        let table_factors = factors(24);
        let strategy = ReturnSeries::new("net", months(30)[6..].iter().map(|d| (*d, 0.01)));
        let table = summary_against_market("Strategy (net)", &strategy, &table_factors, &PerformanceConfig::default());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].n, 18);
        assert_eq!(table.rows[1].n, 18);
        assert_eq!(table.rows[1].series, MARKET_LABEL);
    }

    #[test]
    fn test_figure_series_names() {
        let series = ReturnSeries::new("NET", months(3).into_iter().zip([0.1, -0.5, 0.2]));
        let figures = figure_series(&series, &PerformanceConfig::default());
        let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["wealth_net", "drawdown_net", "rolling_sharpe_net"]);
        assert_relative_eq!(figures[0].points[2].value, 1.1 * 0.5 * 1.2, epsilon = 1e-12);
        assert_relative_eq!(figures[1].points[1].value, -0.5, epsilon = 1e-12);
        assert!(figures[2].points[2].value.is_nan());
        assert_eq!(returns_export(&series).name, "net");
    }

    #[test]
    fn test_regression_rows_carry_loadings() {
        let table_factors = factors(48);
        let series = ReturnSeries::new(
            "NET",
            table_factors
                .dates()
                .iter()
                .enumerate()
                .map(|(t, d)| (*d, 0.005 + 0.01 * ((t as f64) * 1.9).cos())),
        );
        let fits = vec![
            regress(&series, &table_factors, FactorModel::Capm, &OlsConfig::default()).unwrap(),
            regress(&series, &table_factors, FactorModel::Ff5Umd, &OlsConfig::default()).unwrap(),
        ];
        let table = regression_table(&fits);
        assert_eq!(table.lags, 6);
        assert_eq!(table.rows[0].model, "CAPM");
        assert_eq!(table.rows[0].loadings.len(), 1);
        assert_eq!(table.rows[1].loadings.len(), 6);
        assert_eq!(table.rows[1].loadings[5].factor, "UMD");
        assert_eq!(table.rows[1].nobs, 48);
        assert!(table.to_latex("NET").is_some());
    }
}
