//! Output module for everything the mirror writes locally
//!
//! This module handles:
//! - Preparing the destination directory
//! - Naming and saving fetched bodies
//! - Reusing stylesheets across pages and runs
//! - Rewriting saved files to point at local copies
//! - Check-only reports and crawl statistics

pub mod prompt;
mod rewriter;
mod saver;
pub mod sidecar;
pub mod stats;

pub use prompt::{Confirm, FixedAnswer, StdinConfirm, WritePolicy};
pub use rewriter::{rewrite_local_paths, rewrite_files, Replacements, RewriteSummary, MAX_WORKERS};
pub use saver::{write_with_policy, LocalSaver, SaveError, SaveFormat};
pub use sidecar::{Sidecar, StylesheetCache, SIDECAR_FILE, STYLES_DIR, STYLES_FORMAT};
pub use stats::CrawlStatistics;

use crate::state::CheckStatus;
use crate::MirrorError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Makes sure the destination is a writable directory, creating it if needed
///
/// Called before any network activity so a bad destination aborts early.
///
/// # Returns
///
/// * `Ok(())` - The directory exists and is writable
/// * `Err(MirrorError::NotADirectory)` - The path exists but is not a directory
/// * `Err(MirrorError::NotWritable)` - The directory is read-only
/// * `Err(MirrorError::Destination)` - The directory could not be created
pub fn prepare_destination(path: &Path) -> Result<(), MirrorError> {
    let display = path.display().to_string();

    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(MirrorError::NotADirectory { path: display }),
        Ok(meta) if meta.permissions().readonly() => Err(MirrorError::NotWritable { path: display }),
        Ok(_) => Ok(()),
        Err(_) => {
            fs::create_dir_all(path).map_err(|source| MirrorError::Destination {
                path: display.clone(),
                source,
            })?;
            tracing::info!("Created output destination {}", path.display());
            Ok(())
        }
    }
}

/// Formats one line of a link check report
///
/// # Examples
///
/// ```
/// use sumi_mirror::output::check_line;
/// use sumi_mirror::CheckStatus;
///
/// assert_eq!(
///     check_line("https://example.com/missing", CheckStatus::Not),
///     "https://example.com/missing ... Not"
/// );
/// ```
pub fn check_line(url: &str, status: CheckStatus) -> String {
    format!("{} ... {}", url, status)
}

/// Writes a link check report, one line per target
pub fn write_check_report<W: Write>(out: &mut W, checks: &[(String, CheckStatus)]) -> std::io::Result<()> {
    for (url, status) in checks {
        writeln!(out, "{}", check_line(url, *status))?;
    }
    out.flush()
}
