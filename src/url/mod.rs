//! URL handling module for Sumi-Mirror
//!
//! Pure helpers for resolving references, stripping queries and fragments,
//! and deriving local file names from remote URLs. Nothing in here keeps state.

mod naming;
mod normalize;

pub use naming::{filename, local_name, split_extension};
pub use normalize::{history_domain, normalize_history_url, strip_fragment, strip_query};

use crate::{UrlError, UrlResult};
use url::Url;

/// Returns true if the string is an absolute `http`/`https` URL with a host
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::is_url;
///
/// assert!(is_url("https://example.com/page"));
/// assert!(is_url("http://example.com"));
/// assert!(!is_url("/page"));
/// assert!(!is_url("mailto:someone@example.com"));
/// ```
pub fn is_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Resolves a reference against the page it appeared on
///
/// Absolute references are returned unchanged. Relative references are
/// joined with standard RFC 3986 resolution.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::resolve;
///
/// let url = resolve("https://example.com/docs/index.html", "intro.html").unwrap();
/// assert_eq!(url, "https://example.com/docs/intro.html");
///
/// let url = resolve("https://example.com/docs/", "https://other.com/x").unwrap();
/// assert_eq!(url, "https://other.com/x");
/// ```
pub fn resolve(base: &str, reference: &str) -> UrlResult<String> {
    if is_url(reference) {
        return Ok(reference.to_string());
    }

    let base = Url::parse(base).map_err(|e| UrlError::Parse(format!("{}: {}", base, e)))?;
    let joined = base
        .join(reference)
        .map_err(|e| UrlError::Parse(format!("{}: {}", reference, e)))?;

    Ok(joined.to_string())
}

/// Returns the lowercase host of a URL, or None if the string is not a URL
pub fn hostname(url: &str) -> Option<String> {
    if !is_url(url) {
        return None;
    }
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Returns the site root (scheme, host and explicit port) of a URL
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::root_url;
///
/// assert_eq!(root_url("https://example.com/a/b.html").unwrap(), "https://example.com");
/// assert_eq!(root_url("http://127.0.0.1:8080/x").unwrap(), "http://127.0.0.1:8080");
/// ```
pub fn root_url(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
    }
    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    Ok(parsed.origin().ascii_serialization())
}
