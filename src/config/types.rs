use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Recursive crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Number of hierarchy levels to expand below the seed page
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of targets taken from one extraction pass (0 = unlimited)
    #[serde(rename = "max-items")]
    pub max_items: usize,

    /// Follow links that leave the seed's site root
    #[serde(rename = "follow-external")]
    pub follow_external: bool,

    /// Follow on-site links that climb above the seed's directory
    #[serde(rename = "follow-parent")]
    pub follow_parent: bool,

    /// Skip references until one whose target ends with this marker
    #[serde(rename = "start-marker")]
    pub start_marker: Option<String>,

    /// Base delay between consecutive requests (seconds)
    pub interval: f64,

    /// Upper bound of the random delay added to the interval (seconds)
    pub jitter: f64,

    /// Extra attempts after a transport-level failure
    #[serde(rename = "reconnect-attempts")]
    pub reconnect_attempts: u32,

    /// Pause between transport-level retries (seconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: f64,

    /// Template for local file names
    #[serde(rename = "save-format")]
    pub save_format: String,

    /// Download linked pages and stylesheets
    #[serde(rename = "download-body")]
    pub download_body: bool,

    /// Download images
    #[serde(rename = "download-content")]
    pub download_content: bool,

    /// Rewrite remote references to local paths after the crawl
    #[serde(rename = "rewrite-links")]
    pub rewrite_links: bool,

    /// Skip URLs already present in the download history
    #[serde(rename = "skip-downloaded")]
    pub skip_downloaded: bool,

    /// Only probe whether targets exist, never write files
    #[serde(rename = "check-only")]
    pub check_only: bool,

    /// Number of workers used by the link rewriter (1..=4)
    #[serde(rename = "rewrite-workers")]
    pub rewrite_workers: usize,

    /// Honor the site's robots.txt
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_items: 0,
            follow_external: false,
            follow_parent: true,
            start_marker: None,
            interval: 1.0,
            jitter: 3.0,
            reconnect_attempts: 5,
            retry_delay: 1.0,
            save_format: "%(file)s".to_string(),
            download_body: true,
            download_content: true,
            rewrite_links: true,
            skip_downloaded: false,
            check_only: false,
            rewrite_workers: 1,
            respect_robots: true,
        }
    }
}

impl CrawlConfig {
    /// Base politeness interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Upper bound of the random extra delay as a Duration
    pub fn jitter(&self) -> Duration {
        Duration::from_secs_f64(self.jitter)
    }

    /// Pause between transport retries as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request and matched against robots.txt
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: f64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "read-timeout")]
    pub read_timeout: f64,

    /// Proxy URL applied to every scheme
    pub proxy: Option<String>,

    /// Verify TLS certificates
    #[serde(rename = "verify-tls")]
    pub verify_tls: bool,

    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("sumi-mirror/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: 3.0,
            read_timeout: 60.0,
            proxy: None,
            verify_tls: true,
            headers: BTreeMap::new(),
        }
    }
}

/// Where and how downloaded data is written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives the mirrored files
    pub destination: String,

    /// Directory holding the per-domain download history
    #[serde(rename = "history-dir")]
    pub history_dir: String,

    /// Storage used for the download history
    #[serde(rename = "history-backend")]
    pub history_backend: HistoryBackend,

    /// Directory holding the per-host stylesheet cache
    #[serde(rename = "cache-dir")]
    pub cache_dir: String,

    /// What to do when a target file already exists
    pub overwrite: OverwritePolicy,

    /// What to do when writing a file fails
    #[serde(rename = "on-write-error")]
    pub on_write_error: WriteFailureAction,

    /// Attempts used by the `retry` write failure action
    #[serde(rename = "write-retries")]
    pub write_retries: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: ".".to_string(),
            history_dir: ".sumi-mirror/history".to_string(),
            history_backend: HistoryBackend::Text,
            cache_dir: ".sumi-mirror/cache".to_string(),
            overwrite: OverwritePolicy::Ask,
            on_write_error: WriteFailureAction::Ask,
            write_retries: 3,
        }
    }
}

/// Backing storage of the download history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// One text file per domain, one URL per line
    Text,
    /// One SQLite database shared by all domains
    Sqlite,
}

/// Decision taken when a save target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Ask the operator
    Ask,
    /// Overwrite without asking
    Always,
    /// Keep the existing file
    Never,
}

/// Decision taken when writing a file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteFailureAction {
    /// Ask the operator whether to try again
    Ask,
    /// Give up on the file immediately
    Abort,
    /// Try again up to `write-retries` times
    Retry,
}
