//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client from the `[http]` configuration
//! - Pacing requests through the [`Throttle`]
//! - Retrying transport failures a bounded number of times
//! - Classifying the outcome of each fetch

use crate::config::{CrawlConfig, HttpConfig};
use crate::crawler::throttle::Throttle;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::{Client, Proxy, StatusCode};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A successfully fetched body
#[derive(Debug, Clone)]
pub struct Page {
    /// URL that was requested
    pub url: String,
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if any
    pub content_type: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl Page {
    /// Body decoded as text (invalid UTF-8 sequences replaced)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Status in [200, 400)
    Success(Page),

    /// The server answered with an error status; never retried
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    /// Every attempt failed at the transport level
    Unreachable { url: String, error: String },
}

impl FetchOutcome {
    /// HTTP status of the outcome, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(page) => Some(page.status),
            Self::Status { status, .. } => Some(*status),
            Self::Unreachable { .. } => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The `[http]` configuration section
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (bad proxy or header)
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::HttpConfig;
/// use sumi_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid header {}: {}", name, value),
        }
    }

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs_f64(config.read_timeout))
        .connect_timeout(Duration::from_secs_f64(config.connect_timeout))
        .danger_accept_invalid_certs(!config.verify_tls)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Runs an operation until it succeeds or the retries are used up
///
/// The operation gets the attempt number (starting at 1). Between attempts
/// the task sleeps for `delay`.
///
/// # Arguments
///
/// * `label` - What is being attempted, for the log
/// * `retries` - Additional attempts after the first one
/// * `delay` - Pause between attempts
/// * `op` - The operation
pub async fn with_retries<T, E, F, Fut>(label: &str, retries: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = retries.saturating_add(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!("{} failed ({}/{}): {}; retrying", label, attempt, attempts, e);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Performs the crawl's requests, one at a time
#[derive(Debug)]
pub struct FetchEngine {
    client: Client,
    throttle: Throttle,
    retries: u32,
    retry_delay: Duration,
}

impl FetchEngine {
    pub fn new(client: Client, crawl: &CrawlConfig) -> Self {
        Self {
            client,
            throttle: Throttle::new(crawl.interval(), crawl.jitter()),
            retries: crawl.reconnect_attempts,
            retry_delay: crawl.retry_delay(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn interval(&self) -> Duration {
        self.throttle.interval()
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.throttle.set_interval(interval);
    }

    /// Fetches a URL after waiting for its dispatch slot
    ///
    /// Transport failures are retried; an error status is returned at once.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `referer` - Page the URL was found on, sent as `Referer`
    pub async fn fetch(&mut self, url: &str, referer: Option<&str>) -> FetchOutcome {
        self.throttle.wait().await;

        let client = &self.client;
        let result = with_retries(url, self.retries, self.retry_delay, |_| async move {
            let mut request = client.get(url);
            if let Some(referer) = referer {
                request = request.header(REFERER, referer);
            }

            let response = request.send().await?;
            let status = response.status();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;

            Ok::<_, reqwest::Error>(Page {
                url: url.to_string(),
                final_url,
                status: status.as_u16(),
                content_type,
                body: body.to_vec(),
            })
        })
        .await;
        self.throttle.finished();

        match result {
            Ok(page) => classify(page),
            Err(e) => {
                tracing::error!("Giving up on {}: {}", url, e);
                FetchOutcome::Unreachable {
                    url: url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Splits a response into success and status failure
fn classify(page: Page) -> FetchOutcome {
    if (200..400).contains(&page.status) {
        tracing::debug!("{} answered {}", page.url, page.status);
        return FetchOutcome::Success(page);
    }

    let reason = StatusCode::from_u16(page.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string();

    if (400..500).contains(&page.status) {
        tracing::warn!("{} {}: {}", page.status, reason, page.url);
    } else {
        tracing::error!("{} {}: {}", page.status, reason, page.url);
    }

    FetchOutcome::Status {
        url: page.url,
        status: page.status,
        reason,
    }
}
