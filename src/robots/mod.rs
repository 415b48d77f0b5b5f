//! Robots.txt handling module
//!
//! The crawl policy is fetched once per site root. A site without a
//! robots.txt is not an error for the crawl: callers map
//! [`RobotsError::NotFound`] to [`RobotsPolicy::allow_all`].

mod parser;

pub use parser::RobotsPolicy;

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading robots.txt
#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("No robots.txt at {url} (HTTP {status})")]
    NotFound { url: String, status: u16 },

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },
}

/// Fetches and parses the robots.txt of a site root
///
/// # Arguments
///
/// * `root_url` - Scheme and host of the site, e.g. `https://example.com`
/// * `client` - The HTTP client carrying the configured headers, proxy and timeouts
///
/// # Returns
///
/// * `Ok(RobotsPolicy)` - The parsed policy
/// * `Err(RobotsError::NotFound)` - The site has no robots.txt
/// * `Err(RobotsError::Fetch)` - The request itself failed
pub async fn load(root_url: &str, client: &Client) -> Result<RobotsPolicy, RobotsError> {
    let robots_url = format!("{}/robots.txt", root_url.trim_end_matches('/'));
    tracing::debug!("Checking {}", robots_url);

    let response = client
        .get(&robots_url)
        .send()
        .await
        .map_err(|source| RobotsError::Fetch {
            url: robots_url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RobotsError::NotFound {
            url: robots_url,
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| RobotsError::Fetch {
        url: robots_url.clone(),
        source,
    })?;

    Ok(RobotsPolicy::from_content(&body))
}

/// Loads the policy of a root, treating any failure as "allow all"
pub async fn load_or_allow_all(root_url: &str, client: &Client) -> RobotsPolicy {
    match load(root_url, client).await {
        Ok(policy) => policy,
        Err(RobotsError::NotFound { url, status }) => {
            tracing::debug!("robots.txt was none ({} returned {})", url, status);
            RobotsPolicy::allow_all()
        }
        Err(e) => {
            tracing::warn!("{}; crawling without robots.txt rules", e);
            RobotsPolicy::allow_all()
        }
    }
}

/// Raises the configured interval to the site's crawl delay when that is longer
///
/// The adjustment is logged once, here.
pub fn effective_interval(configured: Duration, policy: &RobotsPolicy, user_agent: &str) -> Duration {
    match policy.crawl_delay(user_agent) {
        Some(delay) if delay > configured => {
            tracing::warn!(
                "Interval raised from {:.1}s to {:.1}s to honor robots.txt crawl-delay",
                configured.as_secs_f64(),
                delay.as_secs_f64()
            );
            delay
        }
        _ => configured,
    }
}
