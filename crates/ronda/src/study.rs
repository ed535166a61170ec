//! End-to-end momentum study over a universe and a price panel.
//!
//! A [`Study`] owns the cleaned monthly returns and the per-month eligible
//! sets, so the main backtest and every robustness run see identical inputs.

use crate::error::{Result, StudyError};
use crate::universe::{Universe, eligibility};
use chrono::NaiveDate;
use ndarray::Array2;
use ronda_backtest::{
    Backtest, BacktestConfig, BacktestResult, CostSensitivityRow, DEFAULT_COST_GRID_BPS,
    DEFAULT_LOOKBACKS, LookbackRow, PerformanceConfig, PerformanceSummary, TurnoverStats,
    cost_grid, lookback_grid,
};
use ronda_data::{FactorTable, PricePanel, ReturnCleaning, ReturnSeries};
use ronda_regression::{
    BootstrapAlpha, BootstrapConfig, FactorModel, FactorRegression, OlsConfig, bootstrap_capm,
    regress_all,
};
use ronda_signals::{MomentumConfig, MomentumSignal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Label of the before-cost strategy series.
pub const GROSS: &str = "GROSS";

/// Label of the after-cost strategy series.
pub const NET: &str = "NET";

/// Every knob of a study run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Momentum window
    pub momentum: MomentumConfig,
    /// Portfolio construction, costs and date window
    pub backtest: BacktestConfig,
    /// Cross-sectional return cleaning
    pub cleaning: ReturnCleaning,
    /// Trading days between the signal close and the month-end close (default: 1)
    pub signal_lag_days: usize,
    /// Risk-free rate and rolling window for performance statistics
    pub performance: PerformanceConfig,
    /// Regression and Newey-West settings
    pub regression: OlsConfig,
    /// Factor models to fit (default: CAPM, FF3, FF5, FF5+UMD)
    pub models: Vec<FactorModel>,
    /// CAPM alpha bootstrap
    pub bootstrap: BootstrapConfig,
    /// Per-side costs for the sensitivity grid, in bps
    pub cost_grid_bps: Vec<f64>,
    /// Lookbacks for the robustness grid, in months
    pub lookbacks: Vec<usize>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            momentum: MomentumConfig::default(),
            backtest: BacktestConfig::default(),
            cleaning: ReturnCleaning::default(),
            signal_lag_days: 1,
            performance: PerformanceConfig::default(),
            regression: OlsConfig::default(),
            models: FactorModel::ALL.to_vec(),
            bootstrap: BootstrapConfig::default(),
            cost_grid_bps: DEFAULT_COST_GRID_BPS.to_vec(),
            lookbacks: DEFAULT_LOOKBACKS.to_vec(),
        }
    }
}

impl StudyConfig {
    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.momentum.validate()?;
        Backtest::new(self.backtest)?;
        if self.models.is_empty() {
            return Err(StudyError::Config("at least one factor model is required".to_string()));
        }
        if let Some(bps) = self.cost_grid_bps.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(StudyError::Config(format!("invalid cost grid entry {bps}")));
        }
        if self.lookbacks.contains(&0) {
            return Err(StudyError::Config("lookbacks must be positive".to_string()));
        }
        if self.performance.periods_per_year == 0 {
            return Err(StudyError::Config("periods_per_year must be positive".to_string()));
        }
        Ok(())
    }

    /// Newey-West lags the regressions will use.
    pub fn hac_lags(&self) -> usize {
        self.regression.newey_west.lags.unwrap_or(0)
    }
}

/// Performance of one backtest before and after costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    /// Statistics of gross returns
    pub gross: PerformanceSummary,
    /// Statistics of net returns
    pub net: PerformanceSummary,
    /// Monthly turnover distribution
    pub turnover: TurnoverStats,
}

/// Gross and net returns of a backtest as labelled series.
pub fn strategy_series(result: &BacktestResult) -> [ReturnSeries; 2] {
    let months = result.months();
    [
        ReturnSeries::new(GROSS, months.iter().copied().zip(result.gross_returns())),
        ReturnSeries::new(NET, months.iter().copied().zip(result.net_returns())),
    ]
}

/// A configured study over one universe and price panel.
#[derive(Debug)]
pub struct Study<U: Universe> {
    config: StudyConfig,
    universe: U,
    panel: PricePanel,
    returns: Array2<f64>,
    eligible: Vec<BTreeSet<String>>,
}

impl<U: Universe> Study<U> {
    /// Prepare a study: clean returns and fix the eligible set of each month.
    pub fn new(config: StudyConfig, universe: U, panel: PricePanel) -> Result<Self> {
        config.validate()?;

        let mut returns = panel.monthly_returns();
        let masked = config.cleaning.apply(&mut returns);
        if masked > 0 {
            warn!(masked, "masked extreme monthly returns");
        }

        let eligible = eligibility(&universe, panel.months());
        let priced: BTreeSet<&str> = panel.tickers().iter().map(String::as_str).collect();
        let unpriced = universe
            .symbols()
            .iter()
            .filter(|t| !priced.contains(t.as_str()))
            .count();
        if unpriced > 0 {
            warn!(unpriced, "index members without any price history");
        }
        info!(
            months = panel.n_months(),
            tickers = panel.n_tickers(),
            members = universe.symbols().len(),
            "study prepared"
        );

        Ok(Self {
            config,
            universe,
            panel,
            returns,
            eligible,
        })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// The universe.
    pub const fn universe(&self) -> &U {
        &self.universe
    }

    /// Month-end prices.
    pub const fn panel(&self) -> &PricePanel {
        &self.panel
    }

    /// Cleaned monthly returns aligned with the panel.
    pub const fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    /// Tickers eligible in each panel month.
    pub fn eligible(&self) -> &[BTreeSet<String>] {
        &self.eligible
    }

    /// Eligible tickers for the holding month containing `date`.
    pub fn eligible_on(&self, date: NaiveDate) -> Option<&BTreeSet<String>> {
        self.panel.month_index(date).map(|i| &self.eligible[i])
    }

    /// Run the momentum backtest.
    pub fn run(&self) -> Result<BacktestResult> {
        let signal = MomentumSignal::new(self.config.momentum)?;
        let backtest = Backtest::new(self.config.backtest)?;
        let result = backtest.run(&signal, &self.panel, &self.returns, &self.eligible)?;
        Ok(result)
    }

    /// Summarise a backtest.
    pub fn performance(&self, result: &BacktestResult) -> StrategyPerformance {
        let config = &self.config.performance;
        StrategyPerformance {
            gross: PerformanceSummary::from_returns(&result.gross_returns(), config),
            net: PerformanceSummary::from_returns(&result.net_returns(), config),
            turnover: TurnoverStats::from_turnover(&result.turnover()),
        }
    }

    /// Net performance at every cost level of the grid.
    pub fn cost_sensitivity(&self, result: &BacktestResult) -> Vec<CostSensitivityRow> {
        cost_grid(result, &self.config.cost_grid_bps, &self.config.performance)
    }

    /// Net performance at every lookback of the grid.
    pub fn lookback_sensitivity(&self) -> Result<Vec<LookbackRow>> {
        let rows = lookback_grid(
            self.config.backtest,
            self.config.momentum.skip,
            &self.panel,
            &self.returns,
            &self.eligible,
            &self.config.lookbacks,
            &self.config.performance,
        )?;
        Ok(rows)
    }

    /// Fit every configured factor model to the gross and net returns.
    pub fn regressions(&self, result: &BacktestResult, factors: &FactorTable) -> Result<Vec<FactorRegression>> {
        let fits = regress_all(
            &strategy_series(result),
            factors,
            &self.config.models,
            &self.config.regression,
        )?;
        Ok(fits)
    }

    /// Bootstrap the CAPM alpha of the net returns.
    pub fn bootstrap(&self, result: &BacktestResult, factors: &FactorTable) -> Result<BootstrapAlpha> {
        let [_, net] = strategy_series(result);
        Ok(bootstrap_capm(&net, factors, &self.config.bootstrap)?)
    }
}
