use crate::url::normalize::{strip_fragment, strip_query};
use url::Url;

/// Extension used when a URL does not carry one
const DEFAULT_EXTENSION: &str = ".html";

/// Returns the last path segment of a URL, percent-decoded
///
/// Query and fragment are removed and a trailing slash is ignored, so the
/// root of a site yields its host name.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::filename;
///
/// assert_eq!(filename("https://example.com/img/a%20b.png?x=1"), "a b.png");
/// assert_eq!(filename("https://example.com/docs/"), "docs");
/// assert_eq!(filename("https://example.com/"), "example.com");
/// ```
pub fn filename(url: &str) -> String {
    let base = strip_query(strip_fragment(url)).trim_end_matches('/');
    let last = base.rsplit('/').next().unwrap_or(base);

    urlencoding::decode(last)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

/// Splits a URL into stem and extension
///
/// The extension defaults to `.html` when the last path segment has no dot
/// or when the path is empty or the root. The function is total: every
/// input yields a non-empty extension.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::split_extension;
///
/// assert_eq!(
///     split_extension("https://example.com/style.css"),
///     ("https://example.com/style".to_string(), ".css".to_string())
/// );
/// assert_eq!(split_extension("https://example.com/about").1, ".html");
/// assert_eq!(split_extension("https://example.com").1, ".html");
/// ```
pub fn split_extension(url: &str) -> (String, String) {
    let base = strip_query(strip_fragment(url));
    let trimmed = base.trim_end_matches('/');

    let is_root = match Url::parse(base) {
        Ok(parsed) => matches!(parsed.path(), "" | "/"),
        Err(_) => trimmed.is_empty(),
    };

    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !is_root && !ext.is_empty() && !ext.contains('/') => {
            (stem.to_string(), format!(".{}", ext))
        }
        _ => (trimmed.to_string(), DEFAULT_EXTENSION.to_string()),
    }
}

/// Derives the local file name for a URL
///
/// The decoded filename gets the derived extension appended unless it already
/// ends with it. Path separators smuggled in through percent-encoding are
/// replaced so the result is always a single path component.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::local_name;
///
/// assert_eq!(local_name("https://example.com/2.html"), "2.html");
/// assert_eq!(local_name("https://example.com/about"), "about.html");
/// assert_eq!(local_name("https://example.com/"), "example.com.html");
/// ```
pub fn local_name(url: &str) -> String {
    let name = filename(url).replace(['/', '\\'], "_");
    let name = if name.is_empty() || name == "." || name == ".." {
        "index".to_string()
    } else {
        name
    };

    let (_, ext) = split_extension(url);
    if name.ends_with(&ext) {
        name
    } else {
        format!("{}{}", name, ext)
    }
}
