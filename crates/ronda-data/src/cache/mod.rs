//! Caching layer for fetched quotes.

pub mod sqlite;

pub use sqlite::{CacheStats, SqliteCache};
