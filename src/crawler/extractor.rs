//! Link extraction and filtering
//!
//! Turns the references of a parsed page into frontier items. Each reference
//! is resolved against the page it appeared on and run through the crawl
//! policy; the first rule that matches excludes it.

use crate::config::CrawlConfig;
use crate::crawler::frontier::FrontierItem;
use crate::crawler::parser::TagKind;
use crate::robots::RobotsPolicy;
use crate::state::SiteMap;
use crate::url::{is_url, normalize_history_url, resolve, strip_query};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Everything an extraction pass needs to know about the crawl so far
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Page the references were found on
    pub page_url: &'a str,
    /// Final URL of the seed response
    pub seed_url: &'a str,
    /// Scheme and host (and explicit port) of the seed
    pub root_url: &'a str,
    pub site_map: &'a SiteMap,
    /// Normalized URLs of earlier downloads
    pub history: &'a HashSet<String>,
    pub robots: &'a RobotsPolicy,
}

/// Remembers host lookups for the duration of one pass
#[derive(Debug, Default)]
pub struct DnsProbe {
    results: HashMap<String, bool>,
}

impl DnsProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a host once; later calls return the first answer
    pub async fn reachable(&mut self, host: &str, port: u16) -> bool {
        if let Some(&known) = self.results.get(host) {
            return known;
        }

        let resolved = match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(_) => false,
        };
        if !resolved {
            tracing::warn!("Could not resolve {}; skipping it in this pass", host);
        }

        self.results.insert(host.to_string(), resolved);
        resolved
    }

    /// Returns true if the host was probed and failed
    pub fn is_unreachable(&self, host: &str) -> bool {
        self.results.get(host) == Some(&false)
    }
}

/// Applies the crawl policy to the references of one page
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    follow_external: bool,
    follow_parent: bool,
    start_marker: Option<String>,
    skip_downloaded: bool,
    max_items: usize,
    respect_robots: bool,
    user_agent: String,
}

impl LinkExtractor {
    pub fn new(crawl: &CrawlConfig, user_agent: &str) -> Self {
        Self {
            follow_external: crawl.follow_external,
            follow_parent: crawl.follow_parent,
            start_marker: crawl.start_marker.clone(),
            skip_downloaded: crawl.skip_downloaded,
            max_items: crawl.max_items,
            respect_robots: crawl.respect_robots,
            user_agent: user_agent.to_string(),
        }
    }

    /// Filters references into frontier items, keeping document order
    ///
    /// With `cut` set, the full policy applies: start marker, parent and
    /// external restrictions, in-page fragments, history and the item cap.
    /// Without it only validity, the site map, robots.txt and DNS are checked.
    ///
    /// # Arguments
    ///
    /// * `references` - References in document order
    /// * `kind` - What the references point at
    /// * `cut` - Whether the crawl-shaping rules apply
    /// * `ctx` - Crawl state the rules read from
    pub async fn extract(
        &self,
        references: &[String],
        kind: TagKind,
        cut: bool,
        ctx: &ExtractionContext<'_>,
    ) -> Vec<FrontierItem> {
        let mut dns = DnsProbe::new();
        let mut started = !cut || self.start_marker.is_none();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for reference in references {
            let reference = reference.trim();
            if reference.is_empty() || reference.starts_with('#') {
                continue;
            }
            let Ok(resolved) = resolve(ctx.page_url, reference) else {
                continue;
            };
            if !is_url(&resolved) {
                continue;
            }
            let target = strip_query(&resolved).to_string();

            if !started {
                match &self.start_marker {
                    Some(marker) if target.ends_with(marker.as_str()) => started = true,
                    _ => continue,
                }
            }

            if cut
                && !self.follow_parent
                && !target.starts_with(ctx.seed_url)
                && under_root(&target, ctx.root_url)
            {
                continue;
            }

            if ctx.site_map.contains_reference(reference)
                || ctx.site_map.contains_target(&target)
                || !seen.insert(target.clone())
            {
                continue;
            }

            if cut && target.starts_with(ctx.page_url) && target.contains('#') {
                continue;
            }

            if cut && !self.follow_external && !under_root(&target, ctx.root_url) {
                continue;
            }

            if cut && self.skip_downloaded && ctx.history.contains(&normalize_history_url(&target)) {
                continue;
            }

            tracing::debug!("Found {}", target);

            if self.respect_robots && !ctx.robots.allow(&self.user_agent, &target) {
                tracing::warn!("{} is prohibited by robots.txt", target);
                continue;
            }

            if !self.resolves(reference, &target, &mut dns).await {
                continue;
            }

            items.push(FrontierItem {
                source_url: ctx.page_url.to_string(),
                reference: reference.to_string(),
                target_url: target,
                kind,
            });

            if cut && self.max_items > 0 && items.len() >= self.max_items {
                tracing::debug!("Item cap of {} reached on {}", self.max_items, ctx.page_url);
                break;
            }
        }

        items
    }

    /// Probes absolute references; relative ones only inherit a failed probe
    async fn resolves(&self, reference: &str, target: &str, dns: &mut DnsProbe) -> bool {
        let Ok(url) = Url::parse(target) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };

        if is_url(reference) {
            let port = url.port_or_known_default().unwrap_or(80);
            dns.reachable(host, port).await
        } else {
            !dns.is_unreachable(host)
        }
    }
}

/// Returns true if the URL is the root itself or lies below it
fn under_root(url: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    match url.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "http://127.0.0.1/docs/index.html";
    const SEED: &str = "http://127.0.0.1/docs/";
    const ROOT: &str = "http://127.0.0.1";

    struct Fixture {
        site_map: SiteMap,
        history: HashSet<String>,
        robots: RobotsPolicy,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                site_map: SiteMap::new(),
                history: HashSet::new(),
                robots: RobotsPolicy::allow_all(),
            }
        }

        fn ctx(&self) -> ExtractionContext<'_> {
            ExtractionContext {
                page_url: PAGE,
                seed_url: SEED,
                root_url: ROOT,
                site_map: &self.site_map,
                history: &self.history,
                robots: &self.robots,
            }
        }
    }

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn targets(items: &[FrontierItem]) -> Vec<&str> {
        items.iter().map(|i| i.target_url.as_str()).collect()
    }

    fn extractor(crawl: CrawlConfig) -> LinkExtractor {
        LinkExtractor::new(&crawl, "TestBot/1.0")
    }

    #[tokio::test]
    async fn test_invalid_references_dropped() {
        let fx = Fixture::new();
        let items = extractor(CrawlConfig::default())
            .extract(
                &refs(&["", "#top", "mailto:a@b.c", "javascript:void(0)", "a.html"]),
                TagKind::Link,
                true,
                &fx.ctx(),
            )
            .await;

        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/a.html"]);
        assert_eq!(items[0].reference, "a.html");
        assert_eq!(items[0].source_url, PAGE);
    }

    #[tokio::test]
    async fn test_query_stripped_and_deduplicated() {
        let fx = Fixture::new();
        let items = extractor(CrawlConfig::default())
            .extract(&refs(&["a.html?x=1", "a.html?x=2", "b.html"]), TagKind::Link, true, &fx.ctx())
            .await;

        assert_eq!(
            targets(&items),
            vec!["http://127.0.0.1/docs/a.html", "http://127.0.0.1/docs/b.html"]
        );
        assert_eq!(items[0].reference, "a.html?x=1");
    }

    #[tokio::test]
    async fn test_external_excluded_unless_followed() {
        let fx = Fixture::new();
        let references = refs(&["https://external.invalid/x", "/local.html"]);

        let items = extractor(CrawlConfig::default())
            .extract(&references, TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/local.html"]);

        // Stylesheets ignore the external rule, but the host does not resolve
        let items = extractor(CrawlConfig::default())
            .extract(&references, TagKind::Stylesheet, false, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/local.html"]);
    }

    #[tokio::test]
    async fn test_root_prefix_is_not_enough() {
        let fx = Fixture::new();
        let items = extractor(CrawlConfig::default())
            .extract(&refs(&["http://127.0.0.10/x"]), TagKind::Link, true, &fx.ctx())
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_parent_rule() {
        let fx = Fixture::new();
        let crawl = CrawlConfig {
            follow_parent: false,
            ..Default::default()
        };
        let items = extractor(crawl)
            .extract(&refs(&["../up.html", "inner.html"]), TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/inner.html"]);
    }

    #[tokio::test]
    async fn test_site_map_dedup() {
        let mut fx = Fixture::new();
        fx.site_map.insert("a.html", "a.html");
        fx.site_map.schedule("http://127.0.0.1/docs/b.html");

        let items = extractor(CrawlConfig::default())
            .extract(&refs(&["a.html", "b.html", "c.html"]), TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/c.html"]);
    }

    #[tokio::test]
    async fn test_same_page_fragment_excluded() {
        let fx = Fixture::new();
        let items = extractor(CrawlConfig::default())
            .extract(
                &refs(&["index.html#part", "other.html#part"]),
                TagKind::Link,
                true,
                &fx.ctx(),
            )
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/other.html#part"]);
    }

    #[tokio::test]
    async fn test_history_only_when_skipping() {
        let mut fx = Fixture::new();
        fx.history.insert("http://127.0.0.1/docs/old.html".to_string());
        let references = refs(&["old.html", "new.html"]);

        let items = extractor(CrawlConfig::default())
            .extract(&references, TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(items.len(), 2);

        let crawl = CrawlConfig {
            skip_downloaded: true,
            ..Default::default()
        };
        let items = extractor(crawl)
            .extract(&references, TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/new.html"]);
    }

    #[tokio::test]
    async fn test_robots_denies() {
        let mut fx = Fixture::new();
        fx.robots = RobotsPolicy::from_content("User-agent: *\nDisallow: /docs/private");

        let items = extractor(CrawlConfig::default())
            .extract(&refs(&["private/a.html", "public.html"]), TagKind::Image, true, &fx.ctx())
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/public.html"]);
        assert_eq!(items[0].kind, TagKind::Image);
    }

    #[tokio::test]
    async fn test_start_marker() {
        let fx = Fixture::new();
        let crawl = CrawlConfig {
            start_marker: Some("chapter-2.html".to_string()),
            ..Default::default()
        };
        let references = refs(&["chapter-1.html", "chapter-2.html", "chapter-3.html"]);

        let items = extractor(crawl.clone())
            .extract(&references, TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(
            targets(&items),
            vec![
                "http://127.0.0.1/docs/chapter-2.html",
                "http://127.0.0.1/docs/chapter-3.html"
            ]
        );

        // The marker only gates cut passes
        let items = extractor(crawl)
            .extract(&references, TagKind::Stylesheet, false, &fx.ctx())
            .await;
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_item_cap() {
        let fx = Fixture::new();
        let crawl = CrawlConfig {
            max_items: 2,
            ..Default::default()
        };
        let references = refs(&["1.html", "2.html", "3.html", "4.html", "5.html"]);

        let items = extractor(crawl.clone())
            .extract(&references, TagKind::Link, true, &fx.ctx())
            .await;
        assert_eq!(
            targets(&items),
            vec!["http://127.0.0.1/docs/1.html", "http://127.0.0.1/docs/2.html"]
        );

        let items = extractor(crawl)
            .extract(&references, TagKind::Stylesheet, false, &fx.ctx())
            .await;
        assert_eq!(items.len(), 5);
    }

    #[tokio::test]
    async fn test_unresolvable_host_skipped_for_pass() {
        let fx = Fixture::new();
        let crawl = CrawlConfig {
            follow_external: true,
            ..Default::default()
        };
        let items = extractor(crawl)
            .extract(
                &refs(&["http://no-such-host.invalid/a", "http://no-such-host.invalid/b", "ok.html"]),
                TagKind::Link,
                true,
                &fx.ctx(),
            )
            .await;
        assert_eq!(targets(&items), vec!["http://127.0.0.1/docs/ok.html"]);
    }

    #[test]
    fn test_under_root() {
        assert!(under_root("http://127.0.0.1", ROOT));
        assert!(under_root("http://127.0.0.1/a", ROOT));
        assert!(!under_root("http://127.0.0.1:8080/a", ROOT));
        assert!(!under_root("https://127.0.0.1/a", ROOT));
    }
}
