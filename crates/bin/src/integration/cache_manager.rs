//! Location and opening of the SQLite quote cache.

use ronda_data::cache::SqliteCache;
use ronda_data::error::DataError;
use std::path::{Path, PathBuf};

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/ronda/`
/// - macOS: `~/Library/Caches/ronda/`
/// - Windows: `%LOCALAPPDATA%\ronda\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ronda")
}

/// Get the default cache database path.
pub(crate) fn default_cache_path() -> PathBuf {
    default_cache_dir().join("ronda.db")
}

/// The cache path to use: an explicit override or the default.
pub(crate) fn cache_path(custom: Option<&Path>) -> PathBuf {
    custom.map_or_else(default_cache_path, Path::to_path_buf)
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache(custom: Option<&Path>) -> Result<SqliteCache, DataError> {
    let path = cache_path(custom);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    SqliteCache::new(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_path() {
        let path = default_cache_path();
        assert!(path.ends_with("ronda/ronda.db"));
    }

    #[test]
    fn test_custom_cache_path() {
        let dir = std::env::temp_dir().join("ronda_cache_manager_test");
        let path = dir.join("nested").join("quotes.db");
        assert_eq!(cache_path(Some(&path)), path);

        let cache = open_cache(Some(&path)).unwrap();
        assert_eq!(cache.get_stats().unwrap().total_quotes, 0);
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
