//! HTML parser for collecting references
//!
//! This module handles parsing HTML content to collect, in document order:
//! - Anchor targets (`<a href>`)
//! - Image sources (`<img src>`, or a lazy-loading attribute)
//! - Stylesheets (`<link rel="stylesheet" href>`)
//!
//! References are returned exactly as written in the markup. Resolving and
//! filtering them is the extractor's job.

use scraper::{Html, Selector};

/// Kind of resource a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// A page linked with `<a>`
    Link,
    /// An image
    Image,
    /// A stylesheet
    Stylesheet,
}

/// Where references of one kind are found in the markup
#[derive(Debug, Clone, Copy)]
pub struct TagSpec {
    pub kind: TagKind,
    /// CSS selector for the carrying elements
    pub selector: &'static str,
    /// Attributes to read, the first non-empty one wins
    pub attributes: &'static [&'static str],
}

pub const ANCHORS: TagSpec = TagSpec {
    kind: TagKind::Link,
    selector: "a",
    attributes: &["href"],
};

pub const IMAGES: TagSpec = TagSpec {
    kind: TagKind::Image,
    selector: "img",
    attributes: &["src", "data-lazy-src", "data-src"],
};

pub const STYLESHEETS: TagSpec = TagSpec {
    kind: TagKind::Stylesheet,
    selector: r#"link[rel~="stylesheet"]"#,
    attributes: &["href"],
};

/// References extracted from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    pub anchors: Vec<String>,

    pub images: Vec<String>,

    pub stylesheets: Vec<String>,
}

impl ParsedPage {
    /// References of one kind
    pub fn references(&self, kind: TagKind) -> &[String] {
        match kind {
            TagKind::Link => &self.anchors,
            TagKind::Image => &self.images,
            TagKind::Stylesheet => &self.stylesheets,
        }
    }
}

/// Parses HTML content and collects every reference kind
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title><link rel="stylesheet" href="a.css"></head>
///     <body><a href="/page">Link</a><img data-src="lazy.png"></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.anchors, vec!["/page"]);
/// assert_eq!(parsed.images, vec!["lazy.png"]);
/// assert_eq!(parsed.stylesheets, vec!["a.css"]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        anchors: collect_references(&document, &ANCHORS),
        images: collect_references(&document, &IMAGES),
        stylesheets: collect_references(&document, &STYLESHEETS),
    }
}

/// Collects the references of one tag spec in document order
pub fn collect_references(document: &Html, spec: &TagSpec) -> Vec<String> {
    let Ok(selector) = Selector::parse(spec.selector) else {
        tracing::warn!("Invalid selector {}", spec.selector);
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            spec.attributes
                .iter()
                .filter_map(|attr| element.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_in_document_order() {
        let parsed = parse_html(
            r#"<a href="b.html">b</a><p><a href="a.html">a</a></p><a>no href</a><a href="  ">blank</a>"#,
        );
        assert_eq!(parsed.anchors, vec!["b.html", "a.html"]);
    }

    #[test]
    fn test_image_first_present_attribute_wins() {
        let parsed = parse_html(
            r#"<img src="a.png" data-src="b.png">
               <img src="" data-lazy-src="c.png" data-src="d.png">
               <img data-src="e.png">
               <img alt="nothing">"#,
        );
        assert_eq!(parsed.images, vec!["a.png", "c.png", "e.png"]);
    }

    #[test]
    fn test_stylesheets_only() {
        let parsed = parse_html(
            r#"<link rel="stylesheet" href="a.css">
               <link rel="icon" href="favicon.ico">
               <link rel="alternate stylesheet" href="b.css">
               <link rel="canonical" href="/x">"#,
        );
        assert_eq!(parsed.stylesheets, vec!["a.css", "b.css"]);
    }

    #[test]
    fn test_references_kept_verbatim() {
        let parsed = parse_html(r#"<a href="/x/page.html?q=1#top">x</a>"#);
        assert_eq!(parsed.references(TagKind::Link), ["/x/page.html?q=1#top"]);
    }

    #[test]
    fn test_no_title() {
        let parsed = parse_html("<p>hello</p>");
        assert_eq!(parsed.title, None);
        assert!(parsed.anchors.is_empty());
    }
}
