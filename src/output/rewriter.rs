//! Rewriting remote references to local paths
//!
//! Runs once, after the crawl, over every saved text file. All references
//! are matched in a single pass, longest first, so a local path written by
//! one replacement is never rewritten again by another.

use crate::output::prompt::WritePolicy;
use crate::output::saver::{write_with_policy, SaveError};
use crate::state::SiteMap;
use crate::MirrorError;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Upper bound on rewrite workers
pub const MAX_WORKERS: usize = 4;

/// Result of a rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Files whose content changed
    pub rewritten: usize,
    /// Files left as they were
    pub unchanged: usize,
    /// Files skipped as missing or not UTF-8
    pub skipped: usize,
    /// Files that could not be read or written
    pub failed: usize,
}

impl RewriteSummary {
    fn merge(&mut self, other: RewriteSummary) {
        self.rewritten += other.rewritten;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Compiled reference -> local path replacements
#[derive(Debug)]
pub struct Replacements {
    pattern: Option<Regex>,
    targets: HashMap<String, String>,
}

impl Replacements {
    /// Builds the replacements from a site map
    ///
    /// Entries whose reference equals its local path are left out.
    pub fn from_site_map(site_map: &SiteMap) -> Result<Self, regex::Error> {
        let mut targets = HashMap::new();
        for (reference, local) in site_map.iter() {
            if !reference.is_empty() && reference != local {
                targets.insert(reference.to_string(), local.to_string());
            }
        }

        if targets.is_empty() {
            return Ok(Self {
                pattern: None,
                targets,
            });
        }

        let mut keys: Vec<&str> = targets.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = keys
            .iter()
            .map(|key| regex::escape(key))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&alternation)
            .size_limit(64 * (1 << 20))
            .build()?;

        Ok(Self {
            pattern: Some(pattern),
            targets,
        })
    }

    /// Returns true if nothing would be replaced
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Applies every replacement to a text, returning None if nothing matched
    pub fn apply(&self, text: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        if !pattern.is_match(text) {
            return None;
        }

        let replaced = pattern.replace_all(text, |caps: &regex::Captures<'_>| {
            self.targets
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Some(replaced.into_owned())
    }
}

/// Rewrites every saved file except the skipped ones
///
/// # Arguments
///
/// * `destination` - Directory the local paths are relative to
/// * `site_map` - Final reference -> local path mapping
/// * `skip` - Local paths never touched (images)
/// * `workers` - Number of blocking workers, clamped to 1..=4
/// * `policy` - Decides on write failures
pub async fn rewrite_local_paths(
    destination: &Path,
    site_map: &SiteMap,
    skip: &[String],
    workers: usize,
    policy: WritePolicy,
) -> Result<RewriteSummary, MirrorError> {
    let replacements = Replacements::from_site_map(site_map)
        .map_err(|e| MirrorError::Save(SaveError::Pattern(e)))?;
    if replacements.is_empty() {
        tracing::debug!("Nothing to rewrite");
        return Ok(RewriteSummary::default());
    }

    let skip: HashSet<&str> = skip.iter().map(String::as_str).collect();
    let files: Vec<PathBuf> = site_map
        .local_paths()
        .into_iter()
        .filter(|local| !skip.contains(local.as_str()))
        .map(|local| destination.join(local))
        .collect();

    let workers = workers.clamp(1, MAX_WORKERS).min(files.len().max(1));
    tracing::info!(
        "Rewriting {} file(s) with {} worker(s)",
        files.len(),
        workers
    );

    if workers == 1 {
        return Ok(rewrite_files(&files, &replacements, &policy));
    }

    let replacements = Arc::new(replacements);
    let shard_size = files.len().div_ceil(workers);
    let mut tasks = JoinSet::new();

    for shard in files.chunks(shard_size) {
        let shard = shard.to_vec();
        let replacements = Arc::clone(&replacements);
        let policy = policy.clone();
        tasks.spawn_blocking(move || rewrite_files(&shard, &replacements, &policy));
    }

    let mut summary = RewriteSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let shard = joined.map_err(|e| MirrorError::Worker(e.to_string()))?;
        summary.merge(shard);
    }

    Ok(summary)
}

/// Rewrites a set of files in place, one after another
pub fn rewrite_files(files: &[PathBuf], replacements: &Replacements, policy: &WritePolicy) -> RewriteSummary {
    let mut summary = RewriteSummary::default();

    for path in files {
        match rewrite_file(path, replacements, policy) {
            Ok(Outcome::Rewritten) => summary.rewritten += 1,
            Ok(Outcome::Unchanged) => summary.unchanged += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                tracing::error!("{}", e);
                summary.failed += 1;
            }
        }
    }

    summary
}

enum Outcome {
    Rewritten,
    Unchanged,
    Skipped,
}

fn rewrite_file(path: &Path, replacements: &Replacements, policy: &WritePolicy) -> Result<Outcome, SaveError> {
    let mut failures = 0;
    let text = loop {
        match fs::read_to_string(path) {
            Ok(text) => break text,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::debug!("Skipping {} (not UTF-8)", path.display());
                return Ok(Outcome::Skipped);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Skipping {} (missing)", path.display());
                return Ok(Outcome::Skipped);
            }
            Err(source) => {
                failures += 1;
                tracing::warn!("Reading {} failed: {}", path.display(), source);
                if !policy.retry_write(path, failures) {
                    return Err(SaveError::Read {
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }
    };

    let Some(rewritten) = replacements.apply(&text) else {
        return Ok(Outcome::Unchanged);
    };
    if rewritten == text {
        return Ok(Outcome::Unchanged);
    }

    write_with_policy(path, rewritten.as_bytes(), policy)?;
    tracing::debug!("Rewrote {}", path.display());
    Ok(Outcome::Rewritten)
}
