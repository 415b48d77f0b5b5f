//! Saving fetched bodies under the destination directory
//!
//! File names come from a save format template. The template understands
//! `%(file)s` (local name of the URL), `%(num)d` (a running number),
//! `%(ext)s` (extension without the dot) and `%(root)s` (host of the site).

use crate::output::prompt::WritePolicy;
use crate::url::{local_name, split_extension};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILE_TOKEN: &str = "%(file)s";
const NUM_TOKEN: &str = "%(num)d";
const EXT_TOKEN: &str = "%(ext)s";
const ROOT_TOKEN: &str = "%(root)s";

/// Errors that can occur while writing local files
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to write {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("Failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to scan {path} for numbered files: {source}")]
    Scan { path: String, source: io::Error },

    #[error("Invalid save format pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A save format with the site root already filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFormat {
    template: String,
}

impl SaveFormat {
    /// Binds a template to the host being mirrored
    pub fn for_host(template: &str, host: &str) -> Self {
        Self {
            template: template.replace(ROOT_TOKEN, host),
        }
    }

    /// The template as it will be rendered
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns true if names depend on the running number
    pub fn uses_counter(&self) -> bool {
        self.template.contains(NUM_TOKEN)
    }

    /// Renders the relative path a URL is saved under
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_mirror::output::SaveFormat;
    ///
    /// let format = SaveFormat::for_host("%(root)s/%(num)d.%(ext)s", "example.com");
    /// assert_eq!(format.render("https://example.com/a/logo.png", 7), "example.com/7.png");
    ///
    /// let format = SaveFormat::for_host("%(file)s", "example.com");
    /// assert_eq!(format.render("https://example.com/about", 0), "about.html");
    /// ```
    pub fn render(&self, url: &str, number: u64) -> String {
        let (_, ext) = split_extension(url);
        self.template
            .replace(FILE_TOKEN, &local_name(url))
            .replace(NUM_TOKEN, &number.to_string())
            .replace(EXT_TOKEN, ext.trim_start_matches('.'))
    }

    /// Finds the number to continue counting from
    ///
    /// Files from earlier runs that match the template are scanned and the
    /// largest number found plus one is returned, so new files never take
    /// an existing name. A missing directory starts the count at zero.
    pub fn next_number(&self, destination: &Path) -> Result<u64, SaveError> {
        if !self.uses_counter() {
            return Ok(0);
        }

        let (dir_part, file_part) = match self.template.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, self.template.as_str()),
        };
        if dir_part.is_some_and(|dir| dir.contains(NUM_TOKEN)) || !file_part.contains(NUM_TOKEN) {
            tracing::debug!("Counter in a directory name is not resumed; starting at 0");
            return Ok(0);
        }

        let dir = match dir_part {
            Some(dir) => destination.join(dir),
            None => destination.to_path_buf(),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(SaveError::Scan {
                    path: dir.display().to_string(),
                    source,
                })
            }
        };

        let pattern = Regex::new(&number_pattern(file_part))?;
        let mut next = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(caps) = name.to_str().and_then(|n| pattern.captures(n)) else {
                continue;
            };
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
                next = next.max(n + 1);
            }
        }

        Ok(next)
    }
}

/// Builds an anchored regex for one path component of a template
///
/// The first `%(num)d` becomes the capture group; the other tokens match
/// anything.
fn number_pattern(component: &str) -> String {
    let mut pattern = String::from("^");
    let mut captured = false;
    let mut rest = component;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(NUM_TOKEN) {
            pattern.push_str(if captured { r"\d+" } else { r"(\d+)" });
            captured = true;
            rest = after;
        } else if let Some(after) = rest
            .strip_prefix(FILE_TOKEN)
            .or_else(|| rest.strip_prefix(EXT_TOKEN))
        {
            pattern.push_str(".*");
            rest = after;
        } else if let Some(ch) = rest.chars().next() {
            pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            rest = &rest[ch.len_utf8()..];
        }
    }

    pattern.push('$');
    pattern
}

/// Writes a file, asking the policy what to do after each failure
pub fn write_with_policy(path: &Path, contents: &[u8], policy: &WritePolicy) -> Result<(), SaveError> {
    let mut failures = 0;
    loop {
        match fs::write(path, contents) {
            Ok(()) => return Ok(()),
            Err(source) => {
                failures += 1;
                tracing::warn!("Writing {} failed: {}", path.display(), source);
                if !policy.retry_write(path, failures) {
                    return Err(SaveError::Write {
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }
    }
}

/// Saves bodies below a destination directory
#[derive(Debug, Clone)]
pub struct LocalSaver {
    destination: PathBuf,
    policy: WritePolicy,
}

impl LocalSaver {
    pub fn new(destination: impl Into<PathBuf>, policy: WritePolicy) -> Self {
        Self {
            destination: destination.into(),
            policy,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    /// Saves a body and returns its path relative to the destination
    ///
    /// An existing file is only replaced when the overwrite policy allows
    /// it; otherwise the existing file is kept and its path returned.
    ///
    /// # Arguments
    ///
    /// * `format` - Save format bound to the current host
    /// * `url` - The URL the body came from (names the file)
    /// * `contents` - The body
    /// * `number` - Running number for `%(num)d`
    pub fn save(
        &self,
        format: &SaveFormat,
        url: &str,
        contents: &[u8],
        number: u64,
    ) -> Result<String, SaveError> {
        let relative = format.render(url, number);
        let path = self.destination.join(&relative);

        if path.exists() && !self.policy.allow_overwrite(&path) {
            tracing::info!("Keeping existing {}", path.display());
            return Ok(relative);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SaveError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        write_with_policy(&path, contents, &self.policy)?;
        tracing::info!("Saved {} => {}", url, path.display());

        Ok(relative)
    }
}
