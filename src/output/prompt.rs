//! Operator decisions for file writes
//!
//! Saving and rewriting may need a yes/no answer: overwrite an existing file,
//! or try a failed write again. The answer comes from the configured policy,
//! and only the `ask` policies reach a [`Confirm`] implementation.

use crate::config::{OutputConfig, OverwritePolicy, WriteFailureAction};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

/// Source of yes/no answers
pub trait Confirm: Send + Sync {
    /// Asks a question and returns true for "yes"
    fn confirm(&self, question: &str) -> bool;

    /// False when answers are fixed in advance; a fixed "yes" to a failing
    /// write is then bounded by the retry budget
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Asks on stderr and reads the answer from stdin
///
/// End of input counts as "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            eprint!("{} [y/N] ", question);
            let _ = io::stderr().flush();

            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }

            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return true,
                "" | "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

/// Always gives the same answer; used when nobody is at the terminal
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Overwrite and write-failure decisions shared by the saver and the rewriter
#[derive(Clone)]
pub struct WritePolicy {
    overwrite: OverwritePolicy,
    on_error: WriteFailureAction,
    retries: u32,
    confirm: Arc<dyn Confirm>,
}

impl WritePolicy {
    /// Builds the policy from the output configuration
    pub fn new(config: &OutputConfig, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            overwrite: config.overwrite,
            on_error: config.on_write_error,
            retries: config.write_retries,
            confirm,
        }
    }

    /// A policy that never asks: `ask` is answered with "no"
    pub fn non_interactive(
        overwrite: OverwritePolicy,
        on_error: WriteFailureAction,
        retries: u32,
    ) -> Self {
        Self {
            overwrite,
            on_error,
            retries,
            confirm: Arc::new(FixedAnswer(false)),
        }
    }

    /// Decides whether an existing file may be overwritten
    pub fn allow_overwrite(&self, path: &Path) -> bool {
        match self.overwrite {
            OverwritePolicy::Always => true,
            OverwritePolicy::Never => false,
            OverwritePolicy::Ask => self.confirm.confirm(&format!(
                "{} has already existed\nCan I overwrite?",
                path.display()
            )),
        }
    }

    /// Decides whether a failed write is attempted again
    ///
    /// # Arguments
    ///
    /// * `path` - The file that failed
    /// * `failures` - How many attempts failed so far (starting at 1)
    pub fn retry_write(&self, path: &Path, failures: u32) -> bool {
        match self.on_error {
            WriteFailureAction::Abort => false,
            WriteFailureAction::Retry => failures <= self.retries,
            WriteFailureAction::Ask if !self.confirm.is_interactive() => {
                failures <= self.retries
                    && self
                        .confirm
                        .confirm(&format!("Writing {} failed, continue?", path.display()))
            }
            WriteFailureAction::Ask => self
                .confirm
                .confirm(&format!("Writing {} failed, continue?", path.display())),
        }
    }
}

impl std::fmt::Debug for WritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePolicy")
            .field("overwrite", &self.overwrite)
            .field("on_error", &self.on_error)
            .field("retries", &self.retries)
            .finish()
    }
}
