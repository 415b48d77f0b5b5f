//! Crawl statistics
//!
//! Counters the crawler bumps as it goes, logged once when a seed is done.

use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages saved to the destination (the seed included)
    pub pages_saved: u64,

    /// Images saved to the destination
    pub images_saved: u64,

    /// Stylesheets downloaded and saved
    pub stylesheets_saved: u64,

    /// Stylesheets reused from the cache or an earlier run
    pub stylesheets_reused: u64,

    /// Targets answered with an error status
    pub status_failures: u64,

    /// Targets that could not be reached at all
    pub unreachable: u64,

    /// Items whose file could not be written
    pub write_failures: u64,

    /// Targets classified during a link check
    pub checked: u64,

    /// Hierarchy levels fully expanded
    pub levels: u32,
}

impl CrawlStatistics {
    /// Total number of files this run put on disk
    pub fn files_written(&self) -> u64 {
        self.pages_saved + self.images_saved + self.stylesheets_saved
    }

    /// Total number of fetches that did not succeed
    pub fn failures(&self) -> u64 {
        self.status_failures + self.unreachable
    }

    /// Logs a one-shot summary of the run
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed URL the statistics belong to
    /// * `elapsed` - Wall time spent on the seed
    pub fn log_summary(&self, seed: &str, elapsed: Duration) {
        if self.checked > 0 {
            tracing::info!(
                "Checked {} link(s) under {} in {:.1}s ({} failed)",
                self.checked,
                seed,
                elapsed.as_secs_f64(),
                self.failures()
            );
            return;
        }

        tracing::info!(
            "Mirrored {} in {:.1}s: {} page(s), {} image(s), {} stylesheet(s) ({} reused), {} level(s)",
            seed,
            elapsed.as_secs_f64(),
            self.pages_saved,
            self.images_saved,
            self.stylesheets_saved,
            self.stylesheets_reused,
            self.levels
        );

        if self.failures() > 0 || self.write_failures > 0 {
            tracing::warn!(
                "{} fetch(es) failed ({} by status, {} unreachable), {} write(s) failed",
                self.failures(),
                self.status_failures,
                self.unreachable,
                self.write_failures
            );
        }
    }
}
