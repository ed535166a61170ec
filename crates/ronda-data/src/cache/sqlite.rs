//! SQLite caching layer for fetched quotes.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, Utc};
use polars::prelude::*;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// SQLite cache for daily quotes.
///
/// Besides the quotes themselves, the cache records every successfully
/// fetched `(symbol, start, end)` range so coverage checks do not depend on
/// how many trading days a range happens to contain.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fetch_log (
                symbol TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (symbol, start_date, end_date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Check whether a previous fetch covered `[start, end]` for a symbol.
    pub fn has_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let covered: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM fetch_log
                 WHERE symbol = ?1 AND start_date <= ?2 AND end_date >= ?3
                 LIMIT 1",
                params![symbol, start.to_string(), end.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(covered.is_some())
    }

    /// Record that `[start, end]` was fetched for a symbol.
    pub fn mark_fetched(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO fetch_log (symbol, start_date, end_date, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![symbol, start.to_string(), end.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get cached quotes for a symbol and date range.
    pub fn get_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, date, open, high, low, close, volume, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let mut symbols = Vec::new();
        let mut dates = Vec::new();
        let mut opens = Vec::new();
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        let mut adj_closes = Vec::new();

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, f64>(7)?,
            ))
        })?;

        for row in rows {
            let (sym, date, open, high, low, close, volume, adj_close) = row?;
            symbols.push(sym);
            dates.push(date);
            opens.push(open);
            highs.push(high);
            lows.push(low);
            closes.push(close);
            volumes.push(volume.max(0) as u64);
            adj_closes.push(adj_close);
        }

        if dates.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No cached data found".to_string(),
            });
        }

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), symbols).into(),
            Series::new("date".into(), dates).into(),
            Series::new("open".into(), opens).into(),
            Series::new("high".into(), highs).into(),
            Series::new("low".into(), lows).into(),
            Series::new("close".into(), closes).into(),
            Series::new("volume".into(), volumes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        let df = df
            .lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()?;

        Ok(df)
    }

    /// Store quotes in the cache.
    pub fn put_quotes(&self, df: &DataFrame) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        let symbols = df.column("symbol")?.str()?;
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let opens = df.column("open")?.f64()?;
        let highs = df.column("high")?.f64()?;
        let lows = df.column("low")?.f64()?;
        let closes = df.column("close")?.f64()?;
        let volumes = df.column("volume")?.cast(&DataType::Int64)?;
        let volumes = volumes.i64()?;
        let adj_closes = df.column("adjusted_close")?.f64()?;

        let tx = self.conn.unchecked_transaction()?;

        for i in 0..df.height() {
            let missing = |field: &str| DataError::Parse(format!("Missing {field} in row {i}"));
            let symbol = symbols.get(i).ok_or_else(|| missing("symbol"))?;
            let date = dates.get(i).ok_or_else(|| missing("date"))?;
            let open = opens.get(i).ok_or_else(|| missing("open"))?;
            let high = highs.get(i).ok_or_else(|| missing("high"))?;
            let low = lows.get(i).ok_or_else(|| missing("low"))?;
            let close = closes.get(i).ok_or_else(|| missing("close"))?;
            let volume = volumes.get(i).ok_or_else(|| missing("volume"))?;
            let adj_close = adj_closes
                .get(i)
                .ok_or_else(|| missing("adjusted_close"))?;

            tx.execute(
                "INSERT OR REPLACE INTO quotes
                 (symbol, date, open, high, low, close, volume, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![symbol, date, open, high, low, close, volume, adj_close, cached_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quotes", [])?;
        self.conn.execute("DELETE FROM fetch_log", [])?;
        Ok(())
    }

    /// Clear cached data for one symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        self.conn
            .execute("DELETE FROM fetch_log WHERE symbol = ?1", params![symbol])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let fetches_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fetch_log", [], |row| row.get(0))?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            fetched_ranges: fetches_count as usize,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of quote records
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Number of recorded fetch ranges
    pub fetched_ranges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_quotes(symbol: &str) -> DataFrame {
        let df = df! {
            "symbol" => [symbol, symbol],
            "date" => ["2024-01-02", "2024-01-03"],
            "open" => [10.0, 10.5],
            "high" => [11.0, 11.5],
            "low" => [9.5, 10.0],
            "close" => [10.8, 11.2],
            "volume" => [1000_i64, 1200],
            "adjusted_close" => [10.7, 11.1],
        }
        .unwrap();
        df.lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()
            .unwrap()
    }

    #[test]
    fn test_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_put_and_get_quotes() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_quotes(&sample_quotes("AAA")).unwrap();

        let df = cache.get_quotes("AAA", d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert_eq!(df.height(), 2);
        let adj = df.column("adjusted_close").unwrap().f64().unwrap();
        assert_eq!(adj.get(1), Some(11.1));

        let missing = cache.get_quotes("BBB", d(2024, 1, 1), d(2024, 1, 31));
        assert!(matches!(missing, Err(DataError::MissingData { .. })));
    }

    #[test]
    fn test_fetch_log_coverage() {
        let cache = SqliteCache::in_memory().unwrap();
        assert!(!cache.has_quotes("AAA", d(2024, 1, 1), d(2024, 1, 31)).unwrap());

        cache.mark_fetched("AAA", d(2023, 1, 1), d(2024, 6, 30)).unwrap();
        assert!(cache.has_quotes("AAA", d(2024, 1, 1), d(2024, 1, 31)).unwrap());
        assert!(!cache.has_quotes("AAA", d(2022, 1, 1), d(2024, 1, 31)).unwrap());
        assert!(!cache.has_quotes("BBB", d(2024, 1, 1), d(2024, 1, 31)).unwrap());
    }

    #[test]
    fn test_cache_stats_and_clear() {
        let cache = SqliteCache::in_memory().unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 0);

        cache.put_quotes(&sample_quotes("AAA")).unwrap();
        cache.put_quotes(&sample_quotes("BBB")).unwrap();
        cache.mark_fetched("AAA", d(2024, 1, 1), d(2024, 1, 31)).unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 4);
        assert_eq!(stats.unique_symbols, 2);
        assert_eq!(stats.fetched_ranges, 1);

        cache.clear_symbol("AAA").unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.unique_symbols, 1);
        assert_eq!(stats.fetched_ranges, 0);

        cache.clear_all().unwrap();
        assert_eq!(cache.get_stats().unwrap().total_quotes, 0);
    }
}
