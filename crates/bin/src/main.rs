//! Ronda CLI binary.
//!
//! Command-line interface for the survivorship-free momentum study.

mod integration;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::data_pipeline::{FetchConfig, fetch_universe_prices, print_cache_info};
use ronda::reporting::{
    SUMMARY_TITLE, backtest_summary, cost_rows, figure_series, holdings, lookback_rows,
    market_series, monthly_records, performance_row, regression_table, returns_export,
    summary_against_market,
};
use ronda::universe::{HistoricalUniverse, StaticUniverse, Universe};
use ronda::{Study, StudyConfig, strategy_series};
use ronda_backtest::{PortfolioMode, Selection};
use ronda_data::membership::EARLIEST_EVENT_YEAR;
use ronda_data::prices::write_points;
use ronda_data::yahoo::YahooQuoteProvider;
use ronda_data::{FactorTable, PricePanel, ReturnSeries};
use ronda_output::{ExportFormat, Exporter, ReportBuilder, SummaryTable};
use ronda_regression::{BootstrapConfig, FactorModel, OlsConfig, bootstrap_capm, regress_all};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration as StdDuration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ronda")]
#[command(about = "Ronda: survivorship-free 12-1 momentum on the S&P 500", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect point-in-time index membership
    Universe {
        #[command(flatten)]
        membership: MembershipArgs,

        /// List the members on this date
        #[arg(long)]
        date: Option<NaiveDate>,

        /// List every ticker that was ever a member
        #[arg(long)]
        union: bool,

        /// Write the membership intervals to this CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Download daily adjusted closes for every ticker that was ever a member
    Fetch {
        #[command(flatten)]
        membership: MembershipArgs,

        /// First price date
        #[arg(long)]
        start: NaiveDate,

        /// Last price date (default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output CSV
        #[arg(long)]
        out: PathBuf,

        /// Write month-end closes in wide form instead of daily rows
        #[arg(long)]
        monthly: bool,

        /// Disable caching (always fetch fresh data)
        #[arg(long)]
        no_cache: bool,

        /// Force refresh cached data
        #[arg(long)]
        refresh: bool,

        /// Cache database (default: platform cache dir)
        #[arg(long)]
        cache_db: Option<PathBuf>,

        /// Delay between Yahoo requests in milliseconds
        #[arg(long, default_value = "300")]
        rate_limit_ms: u64,
    },

    /// Run the momentum backtest and write its report
    Backtest {
        #[command(flatten)]
        study: StudyArgs,

        /// Fama-French factor CSV; enables the market row, regressions and bootstrap
        #[arg(long)]
        factors: Option<PathBuf>,

        /// Also run the survivorship-biased backtest on today's constituents
        #[arg(long)]
        survivors: bool,
    },

    /// Fit factor models to return series
    Regress {
        /// Factor CSV (`date,Mkt-RF,SMB,HML,RMW,CMA,RF,UMD`)
        #[arg(long)]
        factors: PathBuf,

        /// Return series CSVs (`date,<name>`)
        #[arg(long, num_args = 1.., required = true)]
        series: Vec<PathBuf>,

        /// Models to fit, comma separated (default: all)
        #[arg(long, value_delimiter = ',')]
        models: Vec<FactorModel>,

        /// Newey-West lags
        #[arg(long, default_value = "6")]
        lags: usize,

        /// Scale the covariance by n/(n-k)
        #[arg(long)]
        small_sample: bool,

        /// Bootstrap the CAPM alpha of every series
        #[arg(long)]
        bootstrap: bool,

        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Summary statistics of a return series against the market
    Summary {
        /// Return series CSV (`date,<name>`)
        #[arg(long)]
        series: PathBuf,

        /// Factor CSV providing the market return
        #[arg(long)]
        factors: PathBuf,

        /// Row label (default: the series column name)
        #[arg(long)]
        label: Option<String>,

        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Cost and lookback sensitivity grids
    Robustness {
        #[command(flatten)]
        study: StudyArgs,

        /// Lookbacks in months, comma separated
        #[arg(long, value_delimiter = ',')]
        lookbacks: Vec<usize>,

        /// Per-side costs in bps, comma separated
        #[arg(long, value_delimiter = ',')]
        costs: Vec<f64>,
    },

    /// Merge Ken French 5-factor and momentum CSVs into one factor file
    Factors {
        /// Extracted 5-factor CSV
        #[arg(long)]
        ff5: PathBuf,

        /// Extracted momentum CSV
        #[arg(long)]
        umd: PathBuf,

        /// Output CSV
        #[arg(long)]
        out: PathBuf,
    },
}

/// Membership source: an interval or panel file, or current list plus change log.
#[derive(Args, Debug)]
struct MembershipArgs {
    /// Membership CSV (`ticker,entry_date,exit_date` or `date,ticker,in_index`)
    #[arg(long, required_unless_present = "current")]
    membership: Option<PathBuf>,

    /// Current constituents CSV, replayed backwards through --changes
    #[arg(long, requires = "changes", conflicts_with = "membership")]
    current: Option<PathBuf>,

    /// Change log CSV (`date,added,removed`)
    #[arg(long, requires = "current")]
    changes: Option<PathBuf>,

    /// First date of the reconstructed history (default: 1990-01-01)
    #[arg(long)]
    history_start: Option<NaiveDate>,

    /// Last date of the reconstructed history (default: today)
    #[arg(long)]
    history_end: Option<NaiveDate>,
}

/// Inputs and overrides shared by the backtest and robustness commands.
#[derive(Args, Debug)]
struct StudyArgs {
    #[command(flatten)]
    membership: MembershipArgs,

    /// Price CSV (long `ticker,date,adjusted_close` or wide `date,<TICKER>...`)
    #[arg(long)]
    prices: PathBuf,

    /// JSON study configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Command-line overrides applied on top of the configuration file.
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Momentum lookback in months
    #[arg(long)]
    lookback: Option<usize>,

    /// Most recent months skipped by the signal
    #[arg(long)]
    skip: Option<usize>,

    /// Names per leg
    #[arg(long, conflicts_with = "quantile")]
    top_n: Option<usize>,

    /// Fraction of the ranked cross-section per leg, in (0, 0.5]
    #[arg(long)]
    quantile: Option<f64>,

    /// Hold the long leg only
    #[arg(long)]
    long_only: bool,

    /// Minimum names per leg for a month to trade
    #[arg(long)]
    min_names: Option<usize>,

    /// Per-side transaction cost in bps
    #[arg(long)]
    cost_bps: Option<f64>,

    /// Drift last month's weights by realised returns before measuring turnover
    #[arg(long)]
    drift: bool,

    /// First holding month
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last holding month
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Trading days between the signal close and the month-end close
    #[arg(long)]
    signal_lag_days: Option<usize>,

    /// Keep extreme returns and skip winsorisation
    #[arg(long)]
    no_cleaning: bool,

    /// Newey-West lags
    #[arg(long)]
    lags: Option<usize>,

    /// Bootstrap resamples
    #[arg(long)]
    bootstrap_iters: Option<usize>,

    /// Bootstrap seed
    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut StudyConfig) {
        if let Some(lookback) = self.lookback {
            config.momentum.lookback = lookback;
        }
        if let Some(skip) = self.skip {
            config.momentum.skip = skip;
        }
        if let Some(n) = self.top_n {
            config.backtest.portfolio.selection = Selection::TopN(n);
        }
        if let Some(q) = self.quantile {
            config.backtest.portfolio.selection = Selection::Quantile(q);
        }
        if self.long_only {
            config.backtest.portfolio.mode = PortfolioMode::LongOnly;
        }
        if let Some(min_names) = self.min_names {
            config.backtest.portfolio.min_names = min_names;
        }
        if let Some(bps) = self.cost_bps {
            config.backtest.costs.cost_bps = bps;
        }
        if self.drift {
            config.backtest.costs.drift_weights = true;
        }
        if self.start.is_some() {
            config.backtest.start = self.start;
        }
        if self.end.is_some() {
            config.backtest.end = self.end;
        }
        if let Some(days) = self.signal_lag_days {
            config.signal_lag_days = days;
        }
        if self.no_cleaning {
            config.cleaning = ronda_data::ReturnCleaning::disabled();
        }
        if let Some(lags) = self.lags {
            config.regression.newey_west.lags = Some(lags);
        }
        if let Some(iters) = self.bootstrap_iters {
            config.bootstrap.n_iters = iters;
        }
        if self.seed.is_some() {
            config.bootstrap.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,ronda=info",
        1 => "info,ronda=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Universe {
            membership,
            date,
            union,
            out,
        } => show_universe(&membership, date, union, out.as_deref())?,
        Commands::Fetch {
            membership,
            start,
            end,
            out,
            monthly,
            no_cache,
            refresh,
            cache_db,
            rate_limit_ms,
        } => {
            let config = FetchConfig {
                use_cache: !no_cache,
                force_refresh: refresh,
                cache_path: cache_db,
            };
            let end = end.unwrap_or_else(|| Utc::now().date_naive());
            fetch_prices(&membership, start, end, &out, monthly, &config, rate_limit_ms).await?;
        }
        Commands::Backtest {
            study,
            factors,
            survivors,
        } => run_backtest(&study, factors.as_deref(), survivors)?,
        Commands::Regress {
            factors,
            series,
            models,
            lags,
            small_sample,
            bootstrap,
            out_dir,
        } => {
            let mut config = OlsConfig::default();
            config.newey_west.lags = Some(lags);
            config.small_sample_correction = small_sample;
            let models = if models.is_empty() {
                FactorModel::ALL.to_vec()
            } else {
                models
            };
            run_regressions(&factors, &series, &models, &config, bootstrap, out_dir.as_deref())?;
        }
        Commands::Summary {
            series,
            factors,
            label,
            out_dir,
        } => run_summary(&series, &factors, label.as_deref(), out_dir.as_deref())?,
        Commands::Robustness {
            study,
            lookbacks,
            costs,
        } => run_robustness(&study, lookbacks, costs)?,
        Commands::Factors { ff5, umd, out } => build_factors(&ff5, &umd, &out)?,
    }

    Ok(())
}

fn load_universe(args: &MembershipArgs) -> Result<HistoricalUniverse, Box<dyn std::error::Error>> {
    let universe = match (&args.membership, &args.current, &args.changes) {
        (Some(path), _, _) => HistoricalUniverse::load(path)?,
        (None, Some(current), Some(changes)) => {
            let start = args
                .history_start
                .or_else(|| NaiveDate::from_ymd_opt(EARLIEST_EVENT_YEAR, 1, 1))
                .ok_or("invalid history start")?;
            let end = args.history_end.unwrap_or_else(|| Utc::now().date_naive());
            HistoricalUniverse::load_change_log(current, changes, start, end)?
        }
        _ => return Err("provide --membership, or --current together with --changes".into()),
    };
    Ok(universe)
}

fn load_config(args: &StudyArgs) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => StudyConfig::load(path)?,
        None => StudyConfig::default(),
    };
    args.overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn show_universe(
    args: &MembershipArgs,
    date: Option<NaiveDate>,
    union: bool,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let universe = load_universe(args)?;

    if let Some(path) = out {
        universe.write(path)?;
        println!("Wrote {} membership intervals to {}", universe.records().len(), path.display());
    }

    if let Some(date) = date {
        let members = universe.members_on(date);
        println!("S&P 500 members on {}: {}\n", date, members.len());
        for ticker in members {
            println!("  {}", ticker);
        }
    } else if union {
        let tickers = universe.union();
        println!("Tickers ever in the index: {}\n", tickers.len());
        for ticker in tickers {
            println!("  {}", ticker);
        }
    } else {
        println!("Point-in-time membership");
        println!("========================\n");
        println!("  Intervals:       {}", universe.records().len());
        println!("  Distinct tickers {}", universe.union().len());
        if let (Some(first), Some(last)) = (universe.first_date(), universe.last_date()) {
            println!("  First entry:     {}", first);
            println!("  Last change:     {}", last);
            println!("  Members at last: {}", universe.size_on(last));
        }
    }

    Ok(())
}

async fn fetch_prices(
    args: &MembershipArgs,
    start: NaiveDate,
    end: NaiveDate,
    out: &Path,
    monthly: bool,
    config: &FetchConfig,
    rate_limit_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let universe = load_universe(args)?;
    let symbols: Vec<String> = universe.union().into_iter().collect();

    println!("Fetching {} tickers from {} to {}", symbols.len(), start, end);
    if config.use_cache {
        print_cache_info(config);
        if config.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: Disabled");
    }
    println!();

    let provider = YahooQuoteProvider::with_rate_limit(StdDuration::from_millis(rate_limit_ms))?;

    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));

    let (points, summary) =
        match fetch_universe_prices(&provider, &symbols, start, end, config, Some(&pb)).await {
            Ok(result) => {
                pb.finish_with_message("done");
                result
            }
            Err(e) => {
                pb.finish_with_message("Failed!");
                return Err(format!("Failed to fetch universe prices: {}", e).into());
            }
        };

    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    if monthly {
        let panel = PricePanel::from_points(&points, 0)?;
        panel.write_wide_csv(out)?;
        println!(
            "\nWrote {} month-end closes for {} tickers to {}",
            panel.n_months(),
            panel.n_tickers(),
            out.display()
        );
    } else {
        write_points(out, &points)?;
        println!("\nWrote {} daily closes to {}", points.len(), out.display());
    }

    println!(
        "  From cache: {}  Downloaded: {}  Failed: {}",
        summary.from_cache,
        summary.fetched,
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        println!("  Missing: {}", summary.failed.join(", "));
    }

    Ok(())
}

fn prepare_study<U: Universe>(
    args: &StudyArgs,
    config: StudyConfig,
    universe: U,
) -> Result<Study<U>, Box<dyn std::error::Error>> {
    let panel = PricePanel::load_csv(&args.prices, config.signal_lag_days)?;
    Ok(Study::new(config, universe, panel)?)
}

fn run_backtest(
    args: &StudyArgs,
    factors: Option<&Path>,
    survivors: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let universe = load_universe(&args.membership)?;
    let biased = survivors.then(|| StaticUniverse::survivors(&universe));
    let factors = factors.map(FactorTable::load_csv).transpose()?;

    let study = prepare_study(args, config.clone(), universe)?;
    let result = study.run()?;
    info!(months = result.len(), "backtest complete");

    let out_dir = &args.out_dir;
    let perf = &config.performance;
    let [gross, net] = strategy_series(&result);

    let mut summary = backtest_summary(&result, factors.as_ref(), perf);
    let mut report = ReportBuilder::new()
        .name("backtest")
        .config(&config)?
        .section("months", &result.len())?
        .section("performance", &study.performance(&result))?;

    let cost_grid = cost_rows(&study.cost_sensitivity(&result));
    cost_grid.export_to_file(&out_dir.join("cost_sensitivity.csv"), ExportFormat::Csv)?;
    report = report.section("cost_sensitivity", &cost_grid)?;

    if let Some(universe) = biased {
        let survivor_study = Study::new(config.clone(), universe, study.panel().clone())?;
        let survivor_result = survivor_study.run()?;
        summary.rows.push(performance_row(
            "Survivors (net)",
            &survivor_result.net_returns(),
            Some(survivor_result.turnover().as_slice()),
            perf,
        ));
        let [_, survivor_net] = strategy_series(&survivor_result);
        let survivor_net = ReturnSeries::new("NET_SURVIVORS", survivor_net.points);
        returns_export(&survivor_net)
            .export_to_file(&out_dir.join("series").join("net_survivors.csv"), ExportFormat::Csv)?;
        report = report.section("survivors", &survivor_study.performance(&survivor_result))?;
    }

    monthly_records(&result).export_to_file(&out_dir.join("monthly_returns.csv"), ExportFormat::Csv)?;
    holdings(&result).export_to_file(&out_dir.join("holdings.csv"), ExportFormat::Csv)?;
    for series in [&gross, &net] {
        let export = returns_export(series);
        export.export_to_file(&out_dir.join("series").join(format!("{}.csv", export.name)), ExportFormat::Csv)?;
        for figure in figure_series(series, perf) {
            figure.export_to_file(&out_dir.join("series").join(format!("{}.csv", figure.name)), ExportFormat::Csv)?;
        }
    }

    write_summary(&summary, out_dir)?;
    println!("{}", summary.to_ascii_table());

    if let Some(factors) = &factors {
        let fits = study.regressions(&result, factors)?;
        let table = regression_table(&fits);
        table.export_to_file(&out_dir.join("ff_regressions.csv"), ExportFormat::Csv)?;
        for series in table.series() {
            if let Some(latex) = table.to_latex(series) {
                std::fs::write(out_dir.join(format!("ff_regressions_{}.tex", series.to_lowercase())), latex)?;
            }
        }
        println!("{}", table.to_ascii_table());

        let market = market_series(factors);
        for figure in figure_series(&market, perf) {
            figure.export_to_file(&out_dir.join("series").join(format!("{}.csv", figure.name.replace(' ', "_"))), ExportFormat::Csv)?;
        }

        let bootstrap = study.bootstrap(&result, factors)?;
        println!(
            "Bootstrap CAPM alpha (net): {:.4} monthly, p = {:.3} ({} resamples)\n",
            bootstrap.alpha, bootstrap.p_value, bootstrap.n_valid
        );
        report = report
            .section("regressions", &table.rows)?
            .section("bootstrap", &bootstrap)?;
    }

    let report = report.build();
    report.write_to_file(&out_dir.join("run_report.json"))?;
    println!("Outputs written to {}", out_dir.display());

    Ok(())
}

fn write_summary(summary: &SummaryTable, out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    summary.export_to_file(&out_dir.join("summary_stats.csv"), ExportFormat::Csv)?;
    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join("summary_stats.tex"), summary.to_latex())?;
    std::fs::write(out_dir.join("summary_stats.md"), summary.to_markdown())?;
    Ok(())
}

fn run_regressions(
    factors: &Path,
    series: &[PathBuf],
    models: &[FactorModel],
    config: &OlsConfig,
    bootstrap: bool,
    out_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let factors = FactorTable::load_csv(factors)?;
    let series = series
        .iter()
        .map(|path| ReturnSeries::load_csv(path, None))
        .collect::<Result<Vec<_>, _>>()?;

    let fits = regress_all(&series, &factors, models, config)?;
    let table = regression_table(&fits);
    println!("{}", table.to_ascii_table());

    let mut bootstraps = Vec::new();
    if bootstrap {
        let boot_config = BootstrapConfig::default();
        for s in &series {
            let result = bootstrap_capm(s, &factors, &boot_config)?;
            println!(
                "Bootstrap CAPM alpha ({}): {:.4} monthly, p = {:.3} ({} resamples)",
                s.name, result.alpha, result.p_value, result.n_valid
            );
            bootstraps.push(json!({ "series": s.name, "result": result }));
        }
    }

    if let Some(out_dir) = out_dir {
        table.export_to_file(&out_dir.join("ff_regressions.csv"), ExportFormat::Csv)?;
        for name in table.series() {
            if let Some(latex) = table.to_latex(name) {
                std::fs::write(out_dir.join(format!("ff_regressions_{}.tex", name.to_lowercase())), latex)?;
            }
        }
        let mut report = ReportBuilder::new()
            .name("regress")
            .config(&json!({
                "models": models,
                "lags": table.lags,
                "small_sample_correction": config.small_sample_correction,
            }))?
            .section("regressions", &table.rows)?;
        if bootstrap {
            report = report.section("bootstrap", &bootstraps)?;
        }
        report.build().write_to_file(&out_dir.join("run_report.json"))?;
        println!("Outputs written to {}", out_dir.display());
    }

    Ok(())
}

fn run_summary(
    series: &Path,
    factors: &Path,
    label: Option<&str>,
    out_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let factors = FactorTable::load_csv(factors)?;
    let series = ReturnSeries::load_csv(series, None)?;
    let label = label.unwrap_or(series.name.as_str()).to_string();
    let config = StudyConfig::default().performance;

    let summary = summary_against_market(&label, &series, &factors, &config);
    println!("{}", summary.to_ascii_table());

    if let Some(out_dir) = out_dir {
        write_summary(&summary, out_dir)?;
        for figure in figure_series(&series, &config) {
            figure.export_to_file(&out_dir.join("series").join(format!("{}.csv", figure.name)), ExportFormat::Csv)?;
        }
        ReportBuilder::new()
            .name("summary")
            .config(&config)?
            .section("title", &SUMMARY_TITLE)?
            .section("rows", &summary.rows)?
            .build()
            .write_to_file(&out_dir.join("run_report.json"))?;
        println!("Outputs written to {}", out_dir.display());
    }

    Ok(())
}

fn run_robustness(
    args: &StudyArgs,
    lookbacks: Vec<usize>,
    costs: Vec<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args)?;
    if !lookbacks.is_empty() {
        config.lookbacks = lookbacks;
    }
    if !costs.is_empty() {
        config.cost_grid_bps = costs;
    }
    config.validate()?;

    let universe = load_universe(&args.membership)?;
    let study = prepare_study(args, config.clone(), universe)?;
    let result = study.run()?;

    let cost_grid = cost_rows(&study.cost_sensitivity(&result));
    let lookback_grid = lookback_rows(&study.lookback_sensitivity()?);

    println!("TRANSACTION COST SENSITIVITY (net)");
    println!("{:>8} {:>12} {:>10} {:>8} {:>10}", "bps", "Ann. Ret", "Ann. Vol", "Sharpe", "Max DD");
    for row in &cost_grid {
        println!(
            "{:>8.1} {:>11.2}% {:>9.2}% {:>8.2} {:>9.2}%",
            row.cost_bps,
            row.ann_return * 100.0,
            row.ann_vol * 100.0,
            row.sharpe,
            row.max_drawdown * 100.0
        );
    }

    println!("\nLOOKBACK ROBUSTNESS (net, skip {})", config.momentum.skip);
    println!("{:>8} {:>8} {:>10} {:>12} {:>8} {:>10}", "Lookback", "Months", "Turnover", "Ann. Ret", "Sharpe", "Max DD");
    for row in &lookback_grid {
        println!(
            "{:>8} {:>8} {:>10.3} {:>11.2}% {:>8.2} {:>9.2}%",
            row.lookback,
            row.months,
            row.mean_turnover,
            row.ann_return * 100.0,
            row.sharpe,
            row.max_drawdown * 100.0
        );
    }

    let out_dir = &args.out_dir;
    cost_grid.export_to_file(&out_dir.join("cost_sensitivity.csv"), ExportFormat::Csv)?;
    lookback_grid.export_to_file(&out_dir.join("robustness_lookbacks.csv"), ExportFormat::Csv)?;
    ReportBuilder::new()
        .name("robustness")
        .config(&config)?
        .section("cost_sensitivity", &cost_grid)?
        .section("lookbacks", &lookback_grid)?
        .build()
        .write_to_file(&out_dir.join("run_report.json"))?;
    println!("\nOutputs written to {}", out_dir.display());

    Ok(())
}

fn build_factors(ff5: &Path, umd: &Path, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let table = FactorTable::from_french_files(ff5, umd)?;
    table.write_csv(out)?;
    match (table.dates().first(), table.dates().last()) {
        (Some(first), Some(last)) => println!(
            "Wrote {} months ({} to {}) of {} to {}",
            table.len(),
            first,
            last,
            table.columns().join(", "),
            out.display()
        ),
        _ => println!("Wrote an empty factor table to {}", out.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backtest_overrides() {
        let cli = Cli::try_parse_from([
            "ronda",
            "backtest",
            "--membership",
            "membership.csv",
            "--prices",
            "prices.csv",
            "--top-n",
            "20",
            "--cost-bps",
            "25",
            "--long-only",
            "--lags",
            "3",
            "--start",
            "2000-01-31",
        ])
        .unwrap();
        let Commands::Backtest { study, factors, survivors } = cli.command else {
            panic!("expected backtest");
        };
        assert!(factors.is_none());
        assert!(!survivors);
        assert_eq!(study.out_dir, PathBuf::from("output"));

        let mut config = StudyConfig::default();
        study.overrides.apply(&mut config);
        assert_eq!(config.backtest.portfolio.selection, Selection::TopN(20));
        assert_eq!(config.backtest.portfolio.mode, PortfolioMode::LongOnly);
        assert!((config.backtest.costs.cost_bps - 25.0).abs() < 1e-12);
        assert_eq!(config.hac_lags(), 3);
        assert_eq!(config.backtest.start, NaiveDate::from_ymd_opt(2000, 1, 31));
        assert_eq!(config.momentum.lookback, 12);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = StudyConfig::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config, StudyConfig::default());
    }

    #[test]
    fn test_top_n_conflicts_with_quantile() {
        let result = Cli::try_parse_from([
            "ronda",
            "robustness",
            "--membership",
            "m.csv",
            "--prices",
            "p.csv",
            "--top-n",
            "10",
            "--quantile",
            "0.1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_membership_source_required() {
        assert!(Cli::try_parse_from(["ronda", "universe"]).is_err());
        assert!(Cli::try_parse_from(["ronda", "universe", "--current", "c.csv"]).is_err());

        let cli = Cli::try_parse_from([
            "ronda",
            "universe",
            "--current",
            "c.csv",
            "--changes",
            "changes.csv",
            "--date",
            "2008-09-30",
        ])
        .unwrap();
        let Commands::Universe { membership, date, .. } = cli.command else {
            panic!("expected universe");
        };
        assert!(membership.membership.is_none());
        assert_eq!(date, NaiveDate::from_ymd_opt(2008, 9, 30));
    }

    #[test]
    fn test_parse_regress_lists() {
        let cli = Cli::try_parse_from([
            "ronda",
            "regress",
            "--factors",
            "ff.csv",
            "--series",
            "gross.csv",
            "net.csv",
            "--models",
            "capm,ff5+umd",
        ])
        .unwrap();
        let Commands::Regress { series, models, lags, .. } = cli.command else {
            panic!("expected regress");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(models, vec![FactorModel::Capm, FactorModel::Ff5Umd]);
        assert_eq!(lags, 6);
    }

    #[test]
    fn test_factors_command_writes_table() {
        let dir = std::env::temp_dir().join("ronda_bin_factors_test");
        std::fs::create_dir_all(&dir).unwrap();
        let ff5 = dir.join("ff5.csv");
        let umd = dir.join("umd.csv");
        std::fs::write(
            &ff5,
            "Header line\n\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n202401,1.00,0.50,-0.20,0.10,0.05,0.40\n202402,2.00,-0.50,0.30,0.20,-0.05,0.42\n\n Annual Factors: January-December\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n2024,10.0,1.0,1.0,1.0,1.0,5.0\n",
        )
        .unwrap();
        std::fs::write(
            &umd,
            "Momentum\n\n,Mom\n202401,3.00\n202402,-1.00\n\nAnnual Factors:\n,Mom\n2024,2.0\n",
        )
        .unwrap();
        let out = dir.join("factors.csv");
        build_factors(&ff5, &umd, &out).unwrap();

        let table = FactorTable::load_csv(&out).unwrap();
        assert_eq!(table.len(), 2);
        let first = table.dates()[0];
        assert!((table.value(first, "UMD").unwrap() - 0.03).abs() < 1e-12);
        assert!((table.value(first, "RF").unwrap() - 0.004).abs() < 1e-12);
        std::fs::remove_dir_all(&dir).ok();
    }
}
