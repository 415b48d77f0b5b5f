//! Text file history backend
//!
//! One file per domain, one normalized URL per line. The file is read once,
//! on the first record; later lookups use the in-memory set.

use crate::history::traits::{HistoryResult, HistoryStore};
use crate::url::normalize_history_url;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// History kept in `<dir>/<domain>.txt`
#[derive(Debug)]
pub struct TextHistory {
    domain: String,
    path: PathBuf,
    known: Option<HashSet<String>>,
}

impl TextHistory {
    /// Opens the history of a domain
    ///
    /// Nothing is created on disk until the first URL is recorded.
    pub fn open(dir: &Path, domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            path: dir.join(format!("{}.txt", file_safe(domain))),
            known: None,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for TextHistory {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load_all(&self) -> HistoryResult<HashSet<String>> {
        if let Some(known) = &self.known {
            return Ok(known.clone());
        }
        self.read_file()
    }

    fn contains(&self, url: &str) -> HistoryResult<bool> {
        let normalized = normalize_history_url(url);
        match &self.known {
            Some(known) => Ok(known.contains(&normalized)),
            None => Ok(self.read_file()?.contains(&normalized)),
        }
    }

    fn record(&mut self, url: &str) -> HistoryResult<bool> {
        let normalized = normalize_history_url(url);
        if self.known.is_none() {
            self.known = Some(self.read_file()?);
        }
        if self.known.as_ref().is_some_and(|known| known.contains(&normalized)) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", normalized)?;
        file.sync_data()?;

        if let Some(known) = self.known.as_mut() {
            known.insert(normalized);
        }
        Ok(true)
    }
}

impl TextHistory {
    fn read_file(&self) -> HistoryResult<HashSet<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Makes a domain usable as a file name (`:` is not allowed everywhere)
fn file_safe(domain: &str) -> String {
    domain.replace([':', '/', '\\'], "_")
}
