//! Daily quote fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting and retries.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with the default delay (300ms between requests) and
    /// three attempts per symbol.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(300))
    }

    /// Create a provider with a custom delay between requests.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        })
    }

    /// Set the number of attempts per symbol and the base backoff; attempt
    /// `k` waits `k * backoff` before retrying.
    pub const fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self.backoff = backoff;
        self
    }

    /// Fetch daily OHLCV data for a single symbol over `[start, end]`.
    ///
    /// # Returns
    /// A DataFrame with columns: symbol, date, open, high, low, close, volume,
    /// adjusted_close
    pub async fn fetch_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        self.retry(symbol, || self.fetch_once(symbol, start, end)).await
    }

    /// Run `fetch` until it succeeds, fails permanently, or runs out of
    /// attempts. `MissingData` is never retried. The rate-limit delay follows
    /// every success.
    async fn retry<T, F, Fut>(&self, symbol: &str, mut fetch: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match fetch().await {
                Ok(value) => {
                    sleep(self.rate_limit_delay).await;
                    return Ok(value);
                }
                Err(e @ DataError::MissingData { .. }) => return Err(e),
                Err(e) if attempt < self.max_attempts => {
                    let wait = self.backoff * attempt;
                    warn!(symbol, attempt, error = %e, ?wait, "quote fetch failed, retrying");
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        // Yahoo treats the end bound as exclusive.
        let end_exclusive = end.succ_opt().unwrap_or(end);
        let start_time = to_offset_datetime(start)?;
        let end_time = to_offset_datetime(end_exclusive)?;

        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await
            .map_err(|e| quote_error(symbol, &e))?;

        let quotes = response.quotes().map_err(|e| quote_error(symbol, &e))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }
        debug!(symbol, rows = quotes.len(), "fetched quotes");

        let dates: Vec<i64> = quotes.iter().map(|q| q.timestamp).collect();
        let opens: Vec<f64> = quotes.iter().map(|q| q.open).collect();
        let highs: Vec<f64> = quotes.iter().map(|q| q.high).collect();
        let lows: Vec<f64> = quotes.iter().map(|q| q.low).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let volumes: Vec<u64> = quotes.iter().map(|q| q.volume).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let mut df = DataFrame::new(vec![
            Series::new("timestamp".into(), dates).into(),
            Series::new("open".into(), opens).into(),
            Series::new("high".into(), highs).into(),
            Series::new("low".into(), lows).into(),
            Series::new("close".into(), closes).into(),
            Series::new("volume".into(), volumes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        let symbol_col: Column = Series::new("symbol".into(), vec![symbol; df.height()]).into();
        df.with_column(symbol_col)?;

        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[
                col("symbol"),
                col("date"),
                col("open"),
                col("high"),
                col("low"),
                col("close"),
                col("volume"),
                col("adjusted_close"),
            ])
            .collect()?;

        Ok(df)
    }
}

/// Error messages that a retry cannot fix: unknown or delisted symbols and
/// empty histories.
const PERMANENT_FAILURES: [&str; 6] = ["404", "not found", "no data", "empty data", "delisted", "no quotes"];

/// Map a provider error, turning permanent failures into `MissingData`.
fn quote_error(symbol: &str, err: &yahoo::YahooError) -> DataError {
    let message = err.to_string();
    if is_permanent_failure(&message) {
        DataError::MissingData {
            symbol: symbol.to_string(),
            reason: message,
        }
    } else {
        DataError::YahooApi(message)
    }
}

fn is_permanent_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    PERMANENT_FAILURES.iter().any(|m| message.contains(m))
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_quotes() {
        let provider = YahooQuoteProvider::new().unwrap();
        let df = provider
            .fetch_quotes("AAPL", d(2024, 1, 1), d(2024, 2, 1))
            .await
            .unwrap();

        assert!(df.height() > 0);
        assert_eq!(
            df.get_column_names(),
            vec![
                "symbol",
                "date",
                "open",
                "high",
                "low",
                "close",
                "volume",
                "adjusted_close"
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_date_range() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.fetch_quotes("AAPL", d(2024, 2, 1), d(2024, 1, 1)).await;
        assert!(matches!(result, Err(DataError::InvalidDateRange { .. })));
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.fetch_quotes("", d(2024, 1, 1), d(2024, 2, 1)).await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }

    fn fast_provider() -> YahooQuoteProvider {
        YahooQuoteProvider::with_rate_limit(Duration::ZERO)
            .unwrap()
            .with_retries(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = fast_provider();
        let mut calls = 0;
        let result = provider
            .retry("AAA", || {
                calls += 1;
                let outcome = if calls < 3 {
                    Err(DataError::YahooApi("connection reset".to_string()))
                } else {
                    Ok(calls)
                };
                async move { outcome }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retries_stop_after_max_attempts() {
        let provider = fast_provider();
        let mut calls = 0;
        let result: Result<()> = provider
            .retry("AAA", || {
                calls += 1;
                async { Err(DataError::YahooApi("timeout".to_string())) }
            })
            .await;
        assert!(matches!(result, Err(DataError::YahooApi(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_missing_data_is_not_retried() {
        let provider = fast_provider();
        let mut calls = 0;
        let result: Result<()> = provider
            .retry("GONE", || {
                calls += 1;
                async {
                    Err(DataError::MissingData {
                        symbol: "GONE".to_string(),
                        reason: "delisted".to_string(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(DataError::MissingData { .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_permanent_failures_are_recognised() {
        assert!(is_permanent_failure("fetching the data from yahoo! finance failed: 404 Not Found"));
        assert!(is_permanent_failure("No data found, symbol may be delisted"));
        assert!(is_permanent_failure("Yahoo! returned an empty data set"));
        assert!(!is_permanent_failure("connection failed: operation timed out"));
        assert!(!is_permanent_failure("429 Too Many Requests"));
    }

    #[test]
    fn test_offset_datetime_conversion() {
        let converted = to_offset_datetime(d(2024, 1, 2)).unwrap();
        assert_eq!(converted.unix_timestamp(), 1_704_153_600);
    }
}
