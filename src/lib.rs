//! Sumi-Mirror: a polite recursive site mirror
//!
//! This crate downloads a seed page together with the pages, images and
//! stylesheets it links to, rewrites intra-site references to local paths,
//! and remembers what it already fetched so later runs can skip repeat work.

pub mod config;
pub mod crawler;
pub mod history;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output destination '{path}' is not a directory")]
    NotADirectory { path: String },

    #[error("Output destination '{path}' is not writable")]
    NotWritable { path: String },

    #[error("Failed to create output destination '{path}': {source}")]
    Destination {
        path: String,
        source: std::io::Error,
    },

    #[error("History error: {0}")]
    History(#[from] history::HistoryError),

    #[error("Save error: {0}")]
    Save(#[from] output::SaveError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Sidecar error: {0}")]
    Sidecar(#[from] serde_json::Error),

    #[error("Rewrite worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid save format: {0}")]
    InvalidFormat(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{mirror, CrawlOutcome, Crawler};
pub use state::{CheckStatus, SiteMap};
