//! Download history module
//!
//! Remembers, per domain, which URLs were already downloaded so a later run
//! with `skip-downloaded` can leave them alone. Two backends implement the
//! same [`HistoryStore`] trait:
//! - a text file per domain (the default)
//! - a shared SQLite database

mod schema;
mod sqlite;
mod text;
mod traits;

pub use sqlite::SqliteHistory;
pub use text::TextHistory;
pub use traits::{HistoryError, HistoryResult, HistoryStore};

use crate::config::{HistoryBackend, OutputConfig};
use crate::url::history_domain;
use std::path::Path;

/// Opens the history of the domain a URL belongs to
///
/// # Arguments
///
/// * `config` - Output configuration naming the history directory and backend
/// * `url` - Any URL of the domain
///
/// # Returns
///
/// * `Ok(Box<dyn HistoryStore>)` - A handle for the domain
/// * `Err(HistoryError)` - The URL has no host, or the backend failed to open
pub fn open_history(config: &OutputConfig, url: &str) -> HistoryResult<Box<dyn HistoryStore>> {
    let domain = history_domain(url).ok_or_else(|| HistoryError::InvalidUrl(url.to_string()))?;
    let dir = Path::new(&config.history_dir);

    Ok(match config.history_backend {
        HistoryBackend::Text => Box::new(TextHistory::open(dir, &domain)),
        HistoryBackend::Sqlite => Box::new(SqliteHistory::open(dir, &domain)?),
    })
}
