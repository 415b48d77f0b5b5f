//! History store trait and error types

use crate::url::normalize_history_url;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while reading or writing the download history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot derive a history domain from '{0}'")]
    InvalidUrl(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Per-domain, append-only set of URLs that were already downloaded
///
/// URLs are normalized with [`normalize_history_url`] on the way in, so
/// `https://example.com/docs/` and `https://example.com/docs` are one entry.
/// Entries are never deleted; pruning is left to the operator.
pub trait HistoryStore: Send {
    /// The domain (host plus explicit port) this handle covers
    fn domain(&self) -> &str;

    /// Human readable location of the backing storage, for log messages
    fn location(&self) -> String;

    /// Reads the full set of recorded URLs
    fn load_all(&self) -> HistoryResult<HashSet<String>>;

    /// Records a URL
    ///
    /// Idempotent: recording a URL that is already present changes nothing.
    /// When this returns `Ok`, the entry is durable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was added
    /// * `Ok(false)` - The URL was already present
    fn record(&mut self, url: &str) -> HistoryResult<bool>;

    /// Checks whether a URL was recorded, reading the full set
    fn contains(&self, url: &str) -> HistoryResult<bool> {
        Ok(self.load_all()?.contains(&normalize_history_url(url)))
    }

    /// Number of recorded URLs
    fn len(&self) -> HistoryResult<usize> {
        Ok(self.load_all()?.len())
    }

    /// Returns true if nothing was recorded yet
    fn is_empty(&self) -> HistoryResult<bool> {
        Ok(self.len()? == 0)
    }
}
