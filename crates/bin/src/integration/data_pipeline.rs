//! Data pipeline for fetching universe prices.
//!
//! Fetches daily adjusted closes for every ticker that was ever an index
//! member. Quotes already covered by the SQLite cache are read from it;
//! everything else comes from Yahoo Finance one symbol at a time, with the
//! provider's rate-limit delay between requests. A failed symbol is logged
//! and skipped.

use super::cache_manager;
use chrono::NaiveDate;
use indicatif::ProgressBar;
use polars::prelude::DataFrame;
use ronda_data::PricePoint;
use ronda_data::cache::SqliteCache;
use ronda_data::prices::points_from_quotes;
use ronda_data::yahoo::YahooQuoteProvider;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Data fetch or cache error.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] ronda_data::DataError),
    /// Not a single symbol produced prices.
    #[error("No data fetched for any of {0} symbols")]
    Empty(usize),
}

/// Configuration for data fetching.
#[derive(Debug, Clone)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cache).
    pub force_refresh: bool,
    /// Cache database location; `None` uses the platform default.
    pub cache_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            cache_path: None,
        }
    }
}

/// Where each symbol's prices came from.
#[derive(Debug, Default)]
pub(crate) struct FetchSummary {
    /// Symbols served from the cache.
    pub from_cache: usize,
    /// Symbols downloaded.
    pub fetched: usize,
    /// Symbols that produced no prices.
    pub failed: Vec<String>,
}

/// Prices of a symbol from the cache, when a previous fetch covered the range.
pub(crate) fn cached_points(
    cache: &SqliteCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<Vec<PricePoint>> {
    if !cache.has_quotes(symbol, start, end).unwrap_or(false) {
        return None;
    }
    let df = cache.get_quotes(symbol, start, end).ok()?;
    points_from_quotes(&df).ok().filter(|p| !p.is_empty())
}

/// Store freshly fetched quotes and record the covered range.
fn store_quotes(cache: &SqliteCache, symbol: &str, df: &DataFrame, start: NaiveDate, end: NaiveDate) {
    if let Err(e) = cache
        .put_quotes(df)
        .and_then(|()| cache.mark_fetched(symbol, start, end))
    {
        warn!(symbol, error = %e, "failed to cache quotes");
    }
}

/// Fetch daily adjusted closes for `symbols` over `[start, end]`.
///
/// The progress bar, when given, advances once per symbol. Points are
/// returned sorted by ticker and date.
pub(crate) async fn fetch_universe_prices(
    provider: &YahooQuoteProvider,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    config: &FetchConfig,
    progress: Option<&ProgressBar>,
) -> Result<(Vec<PricePoint>, FetchSummary), DataPipelineError> {
    let cache = if config.use_cache {
        match cache_manager::open_cache(config.cache_path.as_deref()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "quote cache unavailable, fetching everything");
                None
            }
        }
    } else {
        None
    };

    if let Some(pb) = progress {
        pb.set_length(symbols.len() as u64);
    }

    let mut points = Vec::new();
    let mut summary = FetchSummary::default();

    for symbol in symbols {
        if let Some(pb) = progress {
            pb.set_message(symbol.clone());
        }

        if let Some(cache) = cache.as_ref().filter(|_| !config.force_refresh)
            && let Some(cached) = cached_points(cache, symbol, start, end)
        {
            debug!(symbol, rows = cached.len(), "prices from cache");
            points.extend(cached);
            summary.from_cache += 1;
        } else {
            match provider.fetch_quotes(symbol, start, end).await {
                Ok(df) => {
                    if let Some(cache) = &cache {
                        store_quotes(cache, symbol, &df, start, end);
                    }
                    let fetched = points_from_quotes(&df)?;
                    debug!(symbol, rows = fetched.len(), "prices fetched");
                    points.extend(fetched);
                    summary.fetched += 1;
                }
                Err(e) => {
                    match progress {
                        Some(pb) => pb.suspend(|| warn!(symbol, error = %e, "failed to fetch prices")),
                        None => warn!(symbol, error = %e, "failed to fetch prices"),
                    }
                    summary.failed.push(symbol.clone());
                }
            }
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    if points.is_empty() {
        return Err(DataPipelineError::Empty(symbols.len()));
    }

    points.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    info!(
        cached = summary.from_cache,
        fetched = summary.fetched,
        failed = summary.failed.len(),
        observations = points.len(),
        "universe prices ready"
    );
    Ok((points, summary))
}

/// Print cache location info.
pub(crate) fn print_cache_info(config: &FetchConfig) {
    let path = cache_manager::cache_path(config.cache_path.as_deref());
    println!("  Cache location: {}", path.display());
    if let Some(stats) = cache_manager::open_cache(config.cache_path.as_deref())
        .ok()
        .and_then(|cache| cache.get_stats().ok())
    {
        println!(
            "  Cached data: {} quotes for {} symbols",
            stats.total_quotes, stats.unique_symbols
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn quotes(symbol: &str) -> DataFrame {
        let df = df! {
            "symbol" => [symbol, symbol, symbol],
            "date" => ["2024-01-30", "2024-01-31", "2024-02-29"],
            "open" => [10.0, 10.5, 11.0],
            "high" => [11.0, 11.5, 12.0],
            "low" => [9.5, 10.0, 10.5],
            "close" => [10.8, 11.2, 11.9],
            "volume" => [1000_i64, 1200, 900],
            "adjusted_close" => [10.7, 11.1, 11.8],
        }
        .unwrap();
        df.lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()
            .unwrap()
    }

    #[test]
    fn test_cached_points_requires_logged_range() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_quotes(&quotes("AAA")).unwrap();
        assert!(cached_points(&cache, "AAA", d(2024, 1, 1), d(2024, 2, 29)).is_none());

        cache.mark_fetched("AAA", d(2024, 1, 1), d(2024, 2, 29)).unwrap();
        let points = cached_points(&cache, "AAA", d(2024, 1, 1), d(2024, 2, 29)).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].ticker, "AAA");
        assert_eq!(points[2].date, d(2024, 2, 29));
        assert!((points[1].adjusted_close - 11.1).abs() < 1e-12);
    }

    #[test]
    fn test_cached_points_wider_request_misses() {
        let cache = SqliteCache::in_memory().unwrap();
        store_quotes(&cache, "BBB", &quotes("BBB"), d(2024, 1, 1), d(2024, 2, 29));
        assert!(cached_points(&cache, "BBB", d(2024, 1, 15), d(2024, 2, 1)).is_some());
        assert!(cached_points(&cache, "BBB", d(2023, 1, 1), d(2024, 2, 29)).is_none());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_universe_prices_live() {
        let provider = YahooQuoteProvider::new().unwrap();
        let symbols = vec!["AAPL".to_string(), "NOT-A-REAL-TICKER".to_string()];
        let config = FetchConfig::default();
        let (points, summary) =
            fetch_universe_prices(&provider, &symbols, d(2024, 1, 1), d(2024, 3, 31), &config, None)
                .await
                .unwrap();
        assert!(!points.is_empty());
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.failed, vec!["NOT-A-REAL-TICKER".to_string()]);
    }
}
