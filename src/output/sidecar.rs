//! Stylesheet reuse across pages and runs
//!
//! Stylesheets are shared by most pages of a site, so they are looked up
//! before fetching: first in the mapping sidecar left in `styles/` by an
//! earlier run, then in a per-host body cache outside the destination.

use crate::state::SiteMap;
use crate::url::{filename, hostname};
use crate::MirrorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory (relative to the destination) stylesheets are saved in
pub const STYLES_DIR: &str = "styles";

/// Save format used for stylesheets
pub const STYLES_FORMAT: &str = "styles/%(file)s";

/// Name of the mapping sidecar inside [`STYLES_DIR`]
pub const SIDECAR_FILE: &str = ".mirror_info.json";

/// Contents of the mapping sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Reference -> local path, as rewritten into the pages
    #[serde(default)]
    pub references: BTreeMap<String, String>,

    /// Stylesheet target URL -> local path
    #[serde(default)]
    pub stylesheets: BTreeMap<String, String>,
}

/// Stylesheet lookup and bookkeeping for one destination
#[derive(Debug)]
pub struct StylesheetCache {
    cache_root: PathBuf,
    destination: PathBuf,
    sidecar: Sidecar,
}

impl StylesheetCache {
    /// Opens the cache and loads the sidecar of an earlier run, if any
    ///
    /// # Arguments
    ///
    /// * `cache_root` - Directory holding per-host stylesheet bodies
    /// * `destination` - The mirror's destination directory
    pub fn open(cache_root: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self, MirrorError> {
        let destination = destination.into();
        let path = sidecar_path(&destination);

        let sidecar = match fs::read_to_string(&path) {
            Ok(content) => {
                let sidecar: Sidecar = serde_json::from_str(&content)?;
                tracing::debug!(
                    "Loaded {} stylesheet mapping(s) from {}",
                    sidecar.stylesheets.len(),
                    path.display()
                );
                sidecar
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Sidecar::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            cache_root: cache_root.into(),
            destination,
            sidecar,
        })
    }

    /// Finds a local copy of a stylesheet, returning its relative path
    ///
    /// A sidecar entry only counts while its file still exists. A cached body
    /// is copied into [`STYLES_DIR`] first.
    pub fn lookup(&mut self, target_url: &str) -> Option<String> {
        if let Some(local) = self.sidecar.stylesheets.get(target_url) {
            if self.destination.join(local).is_file() {
                return Some(local.clone());
            }
        }

        let cached = self.cache_path(target_url)?;
        if !cached.is_file() {
            return None;
        }

        let name = filename(target_url);
        let local = format!("{}/{}", STYLES_DIR, name);
        let path = self.destination.join(&local);

        let copied = fs::create_dir_all(self.destination.join(STYLES_DIR))
            .and_then(|_| fs::copy(&cached, &path));
        match copied {
            Ok(_) => {
                self.sidecar
                    .stylesheets
                    .insert(target_url.to_string(), local.clone());
                Some(local)
            }
            Err(e) => {
                tracing::warn!("Could not reuse cached {}: {}", cached.display(), e);
                None
            }
        }
    }

    /// Remembers a downloaded stylesheet
    ///
    /// The body goes into the per-host cache so later mirrors of the same
    /// host can skip the download.
    pub fn store(&mut self, target_url: &str, local: &str, body: &[u8]) {
        self.sidecar
            .stylesheets
            .insert(target_url.to_string(), local.to_string());

        let Some(path) = self.cache_path(target_url) else {
            return;
        };
        let written = match path.parent() {
            Some(parent) => fs::create_dir_all(parent).and_then(|_| fs::write(&path, body)),
            None => fs::write(&path, body),
        };
        if let Err(e) = written {
            tracing::warn!("Could not cache {}: {}", target_url, e);
        }
    }

    /// Writes the sidecar, merged with the current site map
    ///
    /// Nothing is written unless [`STYLES_DIR`] exists.
    pub fn persist(&mut self, site_map: &SiteMap) -> Result<(), MirrorError> {
        let styles = self.destination.join(STYLES_DIR);
        if !styles.is_dir() {
            return Ok(());
        }

        for (reference, local) in site_map.iter() {
            self.sidecar
                .references
                .insert(reference.to_string(), local.to_string());
        }

        let path = sidecar_path(&self.destination);
        fs::write(&path, serde_json::to_string_pretty(&self.sidecar)?)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Stylesheet references of earlier runs whose files are still present
    ///
    /// The crawler merges these into a fresh site map so the references are
    /// rewritten without fetching the stylesheets again.
    pub fn known_references(&self) -> Vec<(String, String)> {
        let prefix = format!("{}/", STYLES_DIR);
        self.sidecar
            .references
            .iter()
            .filter(|(_, local)| local.starts_with(&prefix) && self.destination.join(local.as_str()).is_file())
            .map(|(reference, local)| (reference.clone(), local.clone()))
            .collect()
    }

    fn cache_path(&self, target_url: &str) -> Option<PathBuf> {
        let host = hostname(target_url)?;
        let name = filename(target_url);
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return None;
        }
        Some(self.cache_root.join(host).join(name))
    }
}

fn sidecar_path(destination: &Path) -> PathBuf {
    destination.join(STYLES_DIR).join(SIDECAR_FILE)
}
