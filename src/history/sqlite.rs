//! SQLite history backend
//!
//! All domains share one `history.db` in the history directory.

use crate::history::schema::initialize_schema;
use crate::history::traits::{HistoryResult, HistoryStore};
use crate::url::normalize_history_url;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of the shared history database
pub const DATABASE_FILE: &str = "history.db";

/// History of one domain stored in SQLite
pub struct SqliteHistory {
    conn: Connection,
    domain: String,
    path: PathBuf,
}

impl SqliteHistory {
    /// Opens (creating if needed) the history database in `dir`
    pub fn open(dir: &Path, domain: &str) -> HistoryResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATABASE_FILE);
        let conn = Connection::open(&path)?;

        // Every record must be durable once committed
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            domain: domain.to_string(),
            path,
        })
    }

    /// Creates an in-memory history (for testing)
    #[cfg(test)]
    pub fn new_in_memory(domain: &str) -> HistoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            domain: domain.to_string(),
            path: PathBuf::from(":memory:"),
        })
    }
}

impl HistoryStore for SqliteHistory {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn location(&self) -> String {
        format!("{} ({})", self.path.display(), self.domain)
    }

    fn load_all(&self) -> HistoryResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM history WHERE domain = ?1")?;
        let urls = stmt
            .query_map(params![self.domain], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    fn contains(&self, url: &str) -> HistoryResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE domain = ?1 AND url = ?2",
            params![self.domain, normalize_history_url(url)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record(&mut self, url: &str) -> HistoryResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO history (domain, url, recorded_at) VALUES (?1, ?2, ?3)",
            params![self.domain, normalize_history_url(url), now],
        )?;
        Ok(inserted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_is_idempotent() {
        let mut history = SqliteHistory::new_in_memory("example.com").unwrap();

        assert!(history.record("https://example.com/a/").unwrap());
        assert!(!history.record("https://example.com/a").unwrap());

        assert_eq!(history.len().unwrap(), 1);
        assert!(history.contains("https://example.com/a/").unwrap());
    }

    #[test]
    fn test_domains_are_partitioned() {
        let dir = TempDir::new().unwrap();
        let mut first = SqliteHistory::open(dir.path(), "one.com").unwrap();
        let mut second = SqliteHistory::open(dir.path(), "two.com").unwrap();

        first.record("https://one.com/x").unwrap();
        second.record("https://two.com/y").unwrap();
        second.record("https://two.com/z").unwrap();

        assert_eq!(first.len().unwrap(), 1);
        assert_eq!(second.len().unwrap(), 2);
        assert!(!first.contains("https://two.com/y").unwrap());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut history = SqliteHistory::open(dir.path(), "example.com").unwrap();
            history.record("https://example.com/1").unwrap();
        }

        let history = SqliteHistory::open(dir.path(), "example.com").unwrap();
        assert!(history.contains("https://example.com/1").unwrap());
    }
}
