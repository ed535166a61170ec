//! Performance statistics for monthly return series.
//!
//! Non-finite observations are dropped before every statistic. Functions that
//! need more observations than they get return `NaN` rather than failing.

use ronda_data::returns::quantile;
use serde::{Deserialize, Serialize};

/// Settings shared by the performance statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Annual risk-free rate used for Sharpe ratios (default: 0.02)
    pub rf_annual: f64,
    /// Return observations per year (default: 12)
    pub periods_per_year: usize,
    /// Rolling Sharpe window (default: 36)
    pub rolling_window: usize,
    /// Fewest observations for a rolling value (default: 12)
    pub rolling_min_periods: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            rf_annual: 0.02,
            periods_per_year: 12,
            rolling_window: 36,
            rolling_min_periods: 12,
        }
    }
}

impl PerformanceConfig {
    /// Per-period risk-free rate, `(1 + rf)^(1/periods) - 1`.
    pub fn rf_per_period(&self) -> f64 {
        (1.0 + self.rf_annual).powf(1.0 / self.periods_per_year as f64) - 1.0
    }
}

/// Headline statistics of one return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Number of finite observations
    pub n: usize,
    /// Mean monthly return
    pub mean: f64,
    /// Monthly standard deviation
    pub vol: f64,
    /// Annualised Sharpe ratio of excess returns
    pub sharpe: f64,
    /// Annualised return, `(1 + mean)^12 - 1`
    pub ann_return: f64,
    /// Annualised volatility
    pub ann_vol: f64,
    /// Sample skewness
    pub skew: f64,
    /// Sample excess kurtosis
    pub kurtosis: f64,
    /// Maximum drawdown (non-positive)
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    /// Summarise a return series.
    pub fn from_returns(returns: &[f64], config: &PerformanceConfig) -> Self {
        let clean = finite(returns);
        let periods = config.periods_per_year;
        Self {
            n: clean.len(),
            mean: mean(&clean),
            vol: std_dev(&clean),
            sharpe: sharpe_ratio(&clean, config.rf_per_period(), periods),
            ann_return: annualized_return(&clean, periods),
            ann_vol: annualized_volatility(&clean, periods),
            skew: skewness(&clean),
            kurtosis: excess_kurtosis(&clean),
            max_drawdown: max_drawdown(&clean),
        }
    }
}

/// Distribution of monthly turnover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnoverStats {
    /// Mean turnover
    pub mean: f64,
    /// Median turnover
    pub median: f64,
    /// 95th percentile
    pub p95: f64,
}

impl TurnoverStats {
    /// Summarise a turnover series.
    pub fn from_turnover(turnover: &[f64]) -> Self {
        let clean = finite(turnover);
        Self {
            mean: mean(&clean),
            median: quantile(&clean, 0.5),
            p95: quantile(&clean, 0.95),
        }
    }
}

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean; `NaN` when empty.
pub fn mean(values: &[f64]) -> f64 {
    let clean = finite(values);
    if clean.is_empty() {
        return f64::NAN;
    }
    clean.iter().sum::<f64>() / clean.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    let clean = finite(values);
    if clean.len() < 2 {
        return f64::NAN;
    }
    let m = mean(&clean);
    let ss: f64 = clean.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (clean.len() - 1) as f64).sqrt()
}

/// `(1 + mean)^periods - 1`.
pub fn annualized_return(returns: &[f64], periods_per_year: usize) -> f64 {
    (1.0 + mean(returns)).powi(periods_per_year as i32) - 1.0
}

/// `std * sqrt(periods)`.
pub fn annualized_volatility(returns: &[f64], periods_per_year: usize) -> f64 {
    std_dev(returns) * (periods_per_year as f64).sqrt()
}

/// Annualised Sharpe ratio of `returns - rf_per_period`.
///
/// `NaN` with fewer than two observations or zero volatility.
pub fn sharpe_ratio(returns: &[f64], rf_per_period: f64, periods_per_year: usize) -> f64 {
    let excess: Vec<f64> = finite(returns).iter().map(|r| r - rf_per_period).collect();
    let std = std_dev(&excess);
    if !std.is_finite() || std == 0.0 {
        return f64::NAN;
    }
    mean(&excess) / std * (periods_per_year as f64).sqrt()
}

/// Compounded wealth starting from 1, one value per return.
pub fn cumulative_wealth(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |wealth, r| {
            if r.is_finite() {
                *wealth *= 1.0 + r;
            }
            Some(*wealth)
        })
        .collect()
}

/// `wealth / running peak - 1` per period (zero or negative).
pub fn drawdown_series(returns: &[f64]) -> Vec<f64> {
    let mut peak = 1.0_f64;
    cumulative_wealth(returns)
        .into_iter()
        .map(|w| {
            peak = peak.max(w);
            w / peak - 1.0
        })
        .collect()
}

/// Deepest drawdown; 0 when the series never falls below a prior peak.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    drawdown_series(returns).into_iter().fold(0.0, f64::min)
}

/// Rolling annualised Sharpe of excess returns.
///
/// Each value uses up to `window` trailing observations and is `NaN` until
/// `min_periods` finite observations are available.
pub fn rolling_sharpe(returns: &[f64], config: &PerformanceConfig) -> Vec<f64> {
    let rf = config.rf_per_period();
    (0..returns.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(config.rolling_window);
            let window = finite(&returns[from..=i]);
            if window.len() < config.rolling_min_periods.max(2) {
                f64::NAN
            } else {
                sharpe_ratio(&window, rf, config.periods_per_year)
            }
        })
        .collect()
}

/// Bias-adjusted sample skewness (G1). `NaN` below three observations.
pub fn skewness(values: &[f64]) -> f64 {
    let clean = finite(values);
    let n = clean.len() as f64;
    if clean.len() < 3 {
        return f64::NAN;
    }
    let m = mean(&clean);
    let m2 = clean.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = clean.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-adjusted sample excess kurtosis (G2). `NaN` below four observations.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let clean = finite(values);
    let n = clean.len() as f64;
    if clean.len() < 4 {
        return f64::NAN;
    }
    let m = mean(&clean);
    let m2 = clean.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = clean.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    if m2 == 0.0 {
        return 0.0;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_skip_nan() {
        let values = [0.01, f64::NAN, 0.03];
        assert_relative_eq!(mean(&values), 0.02);
        assert_relative_eq!(std_dev(&values), 0.02 / 2f64.sqrt(), epsilon = 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[0.1]).is_nan());
    }

    #[test]
    fn test_annualised_figures() {
        let returns = [0.01; 24];
        assert_relative_eq!(annualized_return(&returns, 12), 1.01f64.powi(12) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(annualized_volatility(&returns, 12), 0.0);
    }

    #[test]
    fn test_sharpe_zero_vol_is_nan() {
        assert!(sharpe_ratio(&[0.01; 12], 0.0, 12).is_nan());
    }

    #[test]
    fn test_sharpe_of_excess_returns() {
        let returns = [0.02, 0.0, 0.02, 0.0];
        let rf = 0.005;
        // excess mean 0.005, std of alternating +-0.01 with n-1 denominator
        let std = (4.0 * 0.01f64.powi(2) / 3.0).sqrt();
        assert_relative_eq!(sharpe_ratio(&returns, rf, 12), 0.005 / std * 12f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_drawdowns() {
        let returns = [0.1, -0.5, 0.2, 1.0];
        let wealth = cumulative_wealth(&returns);
        assert_relative_eq!(wealth[1], 0.55, epsilon = 1e-12);
        let dd = drawdown_series(&returns);
        assert_relative_eq!(dd[0], 0.0);
        assert_relative_eq!(dd[1], -0.5, epsilon = 1e-12);
        assert_relative_eq!(dd[2], 0.66 / 1.1 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(dd[3], 0.0);
        assert_relative_eq!(max_drawdown(&returns), -0.5, epsilon = 1e-12);
        assert_relative_eq!(max_drawdown(&[0.01, 0.02]), 0.0);
    }

    #[test]
    fn test_rolling_sharpe_min_periods() {
        let config = PerformanceConfig {
            rolling_window: 4,
            rolling_min_periods: 3,
            ..Default::default()
        };
        let returns = [0.01, 0.03, 0.02, 0.05, -0.01];
        let rolling = rolling_sharpe(&returns, &config);
        assert!(rolling[0].is_nan());
        assert!(rolling[1].is_nan());
        assert_relative_eq!(
            rolling[2],
            sharpe_ratio(&returns[..3], config.rf_per_period(), 12),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            rolling[4],
            sharpe_ratio(&returns[1..], config.rf_per_period(), 12),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_skew_and_kurtosis() {
        // symmetric sample
        assert_relative_eq!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0, epsilon = 1e-12);
        // [1,2,3,4,5]: m2 = 2, m4 = 6.8, g2 = -1.3, G2 = -1.2
        assert_relative_eq!(excess_kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]), -1.2, epsilon = 1e-12);
        assert!(skewness(&[1.0, 2.0]).is_nan());
        assert!(skewness(&[0.0, 0.0, 1.0]) > 0.0);
    }

    #[test]
    fn test_summary_and_turnover_stats() {
        let summary = PerformanceSummary::from_returns(&[0.01, 0.02, f64::NAN, 0.03], &PerformanceConfig::default());
        assert_eq!(summary.n, 3);
        assert_relative_eq!(summary.mean, 0.02, epsilon = 1e-12);
        assert!(summary.max_drawdown <= 0.0);

        let stats = TurnoverStats::from_turnover(&[1.0, 0.2, 0.4, 0.6]);
        assert_relative_eq!(stats.mean, 0.55, epsilon = 1e-12);
        assert_relative_eq!(stats.median, 0.5, epsilon = 1e-12);
        assert!(stats.p95 > 0.6 && stats.p95 <= 1.0);
    }
}
