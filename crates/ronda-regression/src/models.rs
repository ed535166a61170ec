//! Fama-French style factor models for monthly strategy returns.
//!
//! Each model regresses the strategy's excess return `r - RF` on a fixed set
//! of factor columns, using only months present in both the strategy series
//! and the factor table.

use crate::error::{RegressionError, Result};
use crate::ols::{OlsConfig, OlsRegression, RegressionResult};
use ndarray::{Array1, Array2};
use ronda_data::{FactorTable, ReturnSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Risk-free column subtracted from strategy returns.
pub const RISK_FREE: &str = "RF";

/// Factor model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorModel {
    /// Market only
    Capm,
    /// Market, size and value
    Ff3,
    /// FF3 plus profitability and investment
    Ff5,
    /// FF5 plus momentum
    Ff5Umd,
}

impl FactorModel {
    /// Every model, from smallest to largest.
    pub const ALL: [Self; 4] = [Self::Capm, Self::Ff3, Self::Ff5, Self::Ff5Umd];

    /// Display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capm => "CAPM",
            Self::Ff3 => "FF3",
            Self::Ff5 => "FF5",
            Self::Ff5Umd => "FF5+UMD",
        }
    }

    /// Factor columns used as regressors.
    pub const fn factors(&self) -> &'static [&'static str] {
        match self {
            Self::Capm => &["Mkt-RF"],
            Self::Ff3 => &["Mkt-RF", "SMB", "HML"],
            Self::Ff5 => &["Mkt-RF", "SMB", "HML", "RMW", "CMA"],
            Self::Ff5Umd => &["Mkt-RF", "SMB", "HML", "RMW", "CMA", "UMD"],
        }
    }
}

impl fmt::Display for FactorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FactorModel {
    type Err = RegressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "capm" => Ok(Self::Capm),
            "ff3" => Ok(Self::Ff3),
            "ff5" => Ok(Self::Ff5),
            "ff5+umd" | "ff5umd" | "ff5-umd" => Ok(Self::Ff5Umd),
            other => Err(RegressionError::InvalidParameter(format!("unknown factor model '{other}'"))),
        }
    }
}

/// Significance stars for a p-value: `***` below 0.01, `**` below 0.05,
/// `*` below 0.10.
pub fn stars(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "***"
    } else if p_value < 0.05 {
        "**"
    } else if p_value < 0.10 {
        "*"
    } else {
        ""
    }
}

/// `(1 + monthly)^12 - 1`.
pub fn annualize(monthly: f64) -> f64 {
    (1.0 + monthly).powi(12) - 1.0
}

/// One fitted (series, model) regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorRegression {
    /// Strategy series label
    pub series: String,
    /// Model specification
    pub model: FactorModel,
    /// Underlying OLS fit
    pub result: RegressionResult,
}

impl FactorRegression {
    /// Monthly alpha.
    pub fn alpha_monthly(&self) -> f64 {
        self.result.alpha().unwrap_or(f64::NAN)
    }

    /// Annualised alpha.
    pub fn alpha_annual(&self) -> f64 {
        annualize(self.alpha_monthly())
    }

    /// Alpha t-statistic.
    pub fn alpha_t(&self) -> f64 {
        self.result.t_value(crate::ols::INTERCEPT).unwrap_or(f64::NAN)
    }

    /// Alpha p-value.
    pub fn alpha_p(&self) -> f64 {
        self.result.p_value(crate::ols::INTERCEPT).unwrap_or(f64::NAN)
    }

    /// Significance stars for alpha.
    pub fn alpha_stars(&self) -> &'static str {
        stars(self.alpha_p())
    }

    /// Loading on a factor.
    pub fn beta(&self, factor: &str) -> Option<f64> {
        self.result.param(factor)
    }

    /// t-statistic of a loading.
    pub fn beta_t(&self, factor: &str) -> Option<f64> {
        self.result.t_value(factor)
    }

    /// R².
    pub fn r_squared(&self) -> f64 {
        self.result.r_squared
    }

    /// Observations used.
    pub fn nobs(&self) -> usize {
        self.result.nobs
    }
}

/// Excess returns and regressors for the months both inputs cover.
///
/// Months where the series or any needed factor is not finite are skipped.
pub fn excess_design(
    series: &ReturnSeries,
    factors: &FactorTable,
    columns: &[&str],
) -> Result<(Array1<f64>, Array2<f64>)> {
    for name in columns.iter().chain(std::iter::once(&RISK_FREE)) {
        if factors.column(name).is_none() {
            return Err(RegressionError::MissingFactor((*name).to_string()));
        }
    }

    let mut y = Vec::new();
    let mut x = Vec::new();
    for (date, ret) in &series.points {
        let Some(rf) = factors.value(*date, RISK_FREE) else {
            continue;
        };
        let row: Option<Vec<f64>> = columns
            .iter()
            .map(|c| factors.value(*date, c).filter(|v| v.is_finite()))
            .collect();
        if let Some(row) = row
            && ret.is_finite()
            && rf.is_finite()
        {
            y.push(ret - rf);
            x.extend(row);
        }
    }

    let n = y.len();
    let x = Array2::from_shape_vec((n, columns.len()), x)
        .map_err(|e| RegressionError::InvalidParameter(e.to_string()))?;
    Ok((Array1::from_vec(y), x))
}

/// Fit one factor model to one strategy series.
pub fn regress(
    series: &ReturnSeries,
    factors: &FactorTable,
    model: FactorModel,
    config: &OlsConfig,
) -> Result<FactorRegression> {
    let columns = model.factors();
    let (y, x) = excess_design(series, factors, columns)?;
    let result = OlsRegression::new(*config).fit(&y, &x, columns)?;

    let fitted = FactorRegression {
        series: series.name.clone(),
        model,
        result,
    };
    info!(
        series = %fitted.series,
        model = %model,
        alpha_ann = fitted.alpha_annual(),
        alpha_t = fitted.alpha_t(),
        r2 = fitted.r_squared(),
        n = fitted.nobs(),
        "factor regression"
    );
    Ok(fitted)
}

/// Fit every model to every series, series-major.
pub fn regress_all(
    series: &[ReturnSeries],
    factors: &FactorTable,
    models: &[FactorModel],
    config: &OlsConfig,
) -> Result<Vec<FactorRegression>> {
    series
        .iter()
        .flat_map(|s| models.iter().map(move |m| (s, *m)))
        .map(|(s, m)| regress(s, factors, m, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ronda_data::calendar::next_month_end;
    use ronda_data::FACTOR_COLUMNS;

    fn table(n: usize) -> FactorTable {
        let mut dates = vec![NaiveDate::from_ymd_opt(2000, 1, 31).unwrap()];
        while dates.len() < n {
            let last = *dates.last().unwrap();
            dates.push(next_month_end(last));
        }
        let columns: Vec<String> = FACTOR_COLUMNS.iter().map(|c| c.to_string()).collect();
        let values = Array2::from_shape_fn((n, columns.len()), |(t, j)| {
            let t = t as f64;
            match columns[j].as_str() {
                "RF" => 0.002,
                _ => 0.01 * ((t + 1.0) * (j as f64 + 1.3)).sin(),
            }
        });
        FactorTable::new(dates, columns, values).unwrap()
    }

    #[test]
    fn test_model_specs() {
        assert_eq!(FactorModel::Ff5Umd.factors().len(), 6);
        assert_eq!(FactorModel::Capm.to_string(), "CAPM");
        assert_eq!("ff5+umd".parse::<FactorModel>().unwrap(), FactorModel::Ff5Umd);
        assert!("apt".parse::<FactorModel>().is_err());
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(0.005), "***");
        assert_eq!(stars(0.03), "**");
        assert_eq!(stars(0.07), "*");
        assert_eq!(stars(0.5), "");
        assert_eq!(stars(f64::NAN), "");
    }

    #[test]
    fn test_capm_recovers_alpha_and_beta() {
        let factors = table(48);
        let mkt = factors.column("Mkt-RF").unwrap().to_owned();
        // r - RF = 0.004 + 1.2 * (Mkt-RF)
        let points: Vec<(NaiveDate, f64)> = factors
            .dates()
            .iter()
            .zip(mkt.iter())
            .map(|(d, m)| (*d, 0.002 + 0.004 + 1.2 * m))
            .collect();
        let series = ReturnSeries::new("net", points);

        let fit = regress(&series, &factors, FactorModel::Capm, &OlsConfig::default()).unwrap();
        assert_relative_eq!(fit.alpha_monthly(), 0.004, epsilon = 1e-10);
        assert_relative_eq!(fit.beta("Mkt-RF").unwrap(), 1.2, epsilon = 1e-10);
        assert_relative_eq!(fit.alpha_annual(), 1.004f64.powi(12) - 1.0, epsilon = 1e-9);
        assert_eq!(fit.nobs(), 48);
        assert_eq!(fit.series, "net");
    }

    #[test]
    fn test_alignment_uses_common_months() {
        let factors = table(24);
        let points: Vec<(NaiveDate, f64)> = factors.dates()[12..]
            .iter()
            .map(|d| (*d, 0.01))
            .chain(std::iter::once((NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(), 0.5)))
            .collect();
        let series = ReturnSeries::new("gross", points);
        let (y, x) = excess_design(&series, &factors, FactorModel::Ff3.factors()).unwrap();
        assert_eq!(y.len(), 12);
        assert_eq!(x.dim(), (12, 3));
        assert_relative_eq!(y[0], 0.008, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_factor() {
        let factors = table(24);
        let narrow = FactorTable::new(
            factors.dates().to_vec(),
            vec!["Mkt-RF".to_string(), "RF".to_string()],
            Array2::zeros((24, 2)),
        )
        .unwrap();
        let series = ReturnSeries::new("net", vec![(factors.dates()[0], 0.01)]);
        assert!(matches!(
            regress(&series, &narrow, FactorModel::Ff3, &OlsConfig::default()),
            Err(RegressionError::MissingFactor(name)) if name == "SMB"
        ));
    }

    #[test]
    fn test_regress_all_order() {
        let factors = table(60);
        let make = |name: &str, scale: f64| {
            ReturnSeries::new(
                name,
                factors
                    .dates()
                    .iter()
                    .enumerate()
                    .map(|(t, d)| (*d, scale * ((t as f64) * 0.37).cos())),
            )
        };
        let series = vec![make("gross", 0.02), make("net", 0.019)];
        let fits = regress_all(&series, &factors, &FactorModel::ALL, &OlsConfig::default()).unwrap();
        assert_eq!(fits.len(), 8);
        assert_eq!(fits[0].series, "gross");
        assert_eq!(fits[3].model, FactorModel::Ff5Umd);
        assert_eq!(fits[4].series, "net");
    }
}
