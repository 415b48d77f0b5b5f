use url::Url;

/// Removes everything from the first `?` onward
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::strip_query;
///
/// assert_eq!(strip_query("https://example.com/a?b=1#c"), "https://example.com/a");
/// assert_eq!(strip_query("/img.png"), "/img.png");
/// ```
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(index) => &url[..index],
        None => url,
    }
}

/// Removes everything from the first `#` onward
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(index) => &url[..index],
        None => url,
    }
}

/// Normalizes a URL for the download history (trailing slash stripped)
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_history_url;
///
/// assert_eq!(normalize_history_url("https://example.com/docs/"), "https://example.com/docs");
/// assert_eq!(normalize_history_url("https://example.com"), "https://example.com");
/// ```
pub fn normalize_history_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Returns the history partition of a URL: its host plus any explicit port
pub fn history_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query_keeps_everything_before() {
        assert_eq!(strip_query("a.css?v=3"), "a.css");
        assert_eq!(strip_query("?only"), "");
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(strip_fragment("page.html#top"), "page.html");
        assert_eq!(strip_fragment("page.html"), "page.html");
    }

    #[test]
    fn test_normalize_history_url_multiple_slashes() {
        assert_eq!(
            normalize_history_url("https://example.com/a//"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_history_domain() {
        assert_eq!(
            history_domain("https://Example.com/a"),
            Some("example.com".to_string())
        );
        assert_eq!(
            history_domain("http://127.0.0.1:9000/a"),
            Some("127.0.0.1:9000".to_string())
        );
        assert_eq!(history_domain("relative/path"), None);
    }
}
