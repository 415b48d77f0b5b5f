//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the level-by-level crawl of one seed:
//! - Preparing the destination before any network activity
//! - Loading robots.txt and the download history
//! - Expanding each level's pages into the next level
//! - Saving pages, stylesheets and images as they arrive
//! - Classifying targets instead of saving them in check-only mode

use crate::config::Config;
use crate::crawler::extractor::{ExtractionContext, LinkExtractor};
use crate::crawler::fetcher::{build_http_client, FetchEngine, FetchOutcome, Page};
use crate::crawler::frontier::{Frontier, FrontierItem, FrontierPage};
use crate::crawler::parser::{parse_html, ParsedPage, TagKind};
use crate::history::{open_history, HistoryStore};
use crate::output::{
    prepare_destination, rewrite_local_paths, Confirm, CrawlStatistics, LocalSaver, RewriteSummary,
    SaveFormat, StylesheetCache, WritePolicy, STYLES_FORMAT,
};
use crate::robots::{self, RobotsPolicy};
use crate::state::{CheckStatus, SiteMap};
use crate::url::{hostname, is_url, root_url};
use crate::{Result, UrlError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// What a finished crawl produced
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// The seed as given
    pub seed: String,

    /// Reference -> local path (or check sentinel)
    pub site_map: SiteMap,

    /// Local paths of saved images, never rewritten
    pub images: Vec<String>,

    /// Check-only verdicts in fetch order
    pub checks: Vec<(String, CheckStatus)>,

    pub stats: CrawlStatistics,

    /// Set once the saved files were rewritten
    pub rewrite: Option<RewriteSummary>,
}

impl CrawlOutcome {
    fn empty(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            ..Default::default()
        }
    }
}

/// Per-seed crawl state, owned by the single crawling task
struct Session {
    seed_url: String,
    root_url: String,
    robots: RobotsPolicy,
    history: Box<dyn HistoryStore>,
    downloaded: HashSet<String>,
    format: SaveFormat,
    next_number: u64,
    styles: Option<StylesheetCache>,
    outcome: CrawlOutcome,
}

impl Session {
    fn take_number(&mut self) -> u64 {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    /// Records a fetch attempt; history trouble never stops the crawl
    fn remember(&mut self, url: &str) {
        if let Err(e) = self.history.record(url) {
            tracing::warn!("Could not record {} in history: {}", url, e);
        }
    }
}

/// Main crawler structure
pub struct Crawler {
    config: Config,
    engine: FetchEngine,
    extractor: LinkExtractor,
    saver: LocalSaver,
    styles_format: SaveFormat,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `confirm` - Answers overwrite and write-failure questions
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(MirrorError)` - The HTTP client could not be built
    pub fn new(config: Config, confirm: Arc<dyn Confirm>) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let engine = FetchEngine::new(client, &config.crawl);
        let extractor = LinkExtractor::new(&config.crawl, &config.http.user_agent);
        let saver = LocalSaver::new(
            &config.output.destination,
            WritePolicy::new(&config.output, confirm),
        );

        Ok(Self {
            config,
            engine,
            extractor,
            saver,
            styles_format: SaveFormat::for_host(STYLES_FORMAT, ""),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check_only(&self) -> bool {
        self.config.crawl.check_only
    }

    /// Crawls one seed down to the configured depth
    ///
    /// A seed that cannot be fetched is logged and yields an empty outcome.
    /// Only a bad destination or a broken history backend is an error.
    pub async fn run(&mut self, seed: &str) -> Result<CrawlOutcome> {
        let started = Instant::now();
        let seed = seed.trim();

        if !is_url(seed) {
            return Err(UrlError::InvalidScheme(seed.to_string()).into());
        }
        let destination = Path::new(&self.config.output.destination).to_path_buf();
        if !self.check_only() {
            prepare_destination(&destination)?;
        }

        let robots = self.load_robots(seed).await?;
        if self.config.crawl.respect_robots && !robots.allow(&self.config.http.user_agent, seed) {
            tracing::warn!("{} is prohibited by robots.txt", seed);
            return Ok(CrawlOutcome::empty(seed));
        }

        tracing::info!("Mirroring {}", seed);
        let page = match self.engine.fetch(seed, None).await {
            FetchOutcome::Success(page) => page,
            failed => {
                tracing::error!("Could not fetch the seed page {}", seed);
                let mut outcome = CrawlOutcome::empty(seed);
                if self.check_only() {
                    outcome.checks.push((seed.to_string(), CheckStatus::Not));
                    outcome.site_map.insert(seed, CheckStatus::Not.as_str());
                    outcome.stats.checked += 1;
                }
                match failed {
                    FetchOutcome::Unreachable { .. } => outcome.stats.unreachable += 1,
                    _ => outcome.stats.status_failures += 1,
                }
                return Ok(outcome);
            }
        };

        let mut session = self.open_session(seed, &page, robots, &destination)?;
        self.handle_seed(&mut session, seed, &page);

        let max_depth = self.config.crawl.max_depth;
        let mut frontier = Frontier::seed(FrontierPage {
            url: session.seed_url.clone(),
            body: page.text(),
        });

        while frontier.depth() < max_depth && !frontier.is_empty() {
            let mut next = frontier.next_level();
            let keep_pages = next.depth() < max_depth;

            while let Some(page) = frontier.pop() {
                self.expand(&mut session, page, &mut next, keep_pages).await;
            }

            session.outcome.stats.levels += 1;
            tracing::info!(
                "Level {} done; {} page(s) to expand next",
                next.depth(),
                next.len()
            );
            frontier = next;
        }

        if let Some(styles) = session.styles.as_mut() {
            styles.persist(&session.outcome.site_map)?;
        }

        session.outcome.stats.log_summary(seed, started.elapsed());
        Ok(session.outcome)
    }

    /// Rewrites the saved files of a finished crawl to use local paths
    ///
    /// Does nothing in check-only mode, when link conversion or body
    /// downloads are disabled, or when nothing was saved.
    pub async fn rewrite(&self, outcome: &mut CrawlOutcome) -> Result<()> {
        let crawl = &self.config.crawl;
        if crawl.check_only || !crawl.rewrite_links || !crawl.download_body || outcome.site_map.is_empty() {
            return Ok(());
        }

        let summary = rewrite_local_paths(
            Path::new(&self.config.output.destination),
            &outcome.site_map,
            &outcome.images,
            crawl.rewrite_workers,
            self.saver.policy().clone(),
        )
        .await?;

        tracing::info!(
            "Rewrote {} file(s) ({} unchanged, {} skipped, {} failed)",
            summary.rewritten,
            summary.unchanged,
            summary.skipped,
            summary.failed
        );
        outcome.rewrite = Some(summary);
        Ok(())
    }

    async fn load_robots(&mut self, seed: &str) -> Result<RobotsPolicy> {
        if !self.config.crawl.respect_robots {
            return Ok(RobotsPolicy::allow_all());
        }

        let root = root_url(seed)?;
        let policy = robots::load_or_allow_all(&root, self.engine.client()).await;
        let interval = robots::effective_interval(
            self.engine.interval(),
            &policy,
            &self.config.http.user_agent,
        );
        self.engine.set_interval(interval);
        Ok(policy)
    }

    fn open_session(
        &self,
        seed: &str,
        page: &Page,
        robots: RobotsPolicy,
        destination: &Path,
    ) -> Result<Session> {
        let seed_url = page.final_url.clone();
        let root = root_url(&seed_url)?;
        let host = hostname(&seed_url).unwrap_or_default();

        let history = open_history(&self.config.output, &seed_url)?;
        tracing::info!("History is kept in {}", history.location());
        let downloaded = if self.config.crawl.skip_downloaded {
            history.load_all()?
        } else {
            HashSet::new()
        };

        let format = SaveFormat::for_host(&self.config.crawl.save_format, &host);
        let next_number = if self.check_only() {
            0
        } else {
            format.next_number(destination)?
        };

        let styles = if !self.check_only() && self.config.crawl.download_body {
            Some(StylesheetCache::open(&self.config.output.cache_dir, destination)?)
        } else {
            None
        };

        let mut outcome = CrawlOutcome::empty(seed);
        if let Some(styles) = &styles {
            for (reference, local) in styles.known_references() {
                outcome.site_map.insert(&reference, &local);
            }
        }

        Ok(Session {
            seed_url,
            root_url: root,
            robots,
            history,
            downloaded,
            format,
            next_number,
            styles,
            outcome,
        })
    }

    fn handle_seed(&self, session: &mut Session, seed: &str, page: &Page) {
        let seed_url = session.seed_url.clone();
        session.outcome.site_map.schedule(seed);
        session.outcome.site_map.schedule(&seed_url);
        session.remember(&seed_url);

        if self.check_only() {
            session.outcome.checks.push((seed_url, CheckStatus::Exists));
            session.outcome.site_map.insert(seed, CheckStatus::Exists.as_str());
            session.outcome.stats.checked += 1;
            return;
        }

        let number = session.take_number();
        match self.saver.save(&session.format, &seed_url, &page.body, number) {
            Ok(local) => {
                session.outcome.site_map.insert(seed, &local);
                session.outcome.stats.pages_saved += 1;
            }
            Err(e) => {
                tracing::error!("{}", e);
                session.outcome.stats.write_failures += 1;
            }
        }
    }

    /// Expands one page: stylesheets, then anchors, then images
    async fn expand(&mut self, session: &mut Session, page: FrontierPage, next: &mut Frontier, keep_pages: bool) {
        // Html is not Send; parse before the first await
        let parsed = parse_html(&page.body);
        tracing::debug!(
            "Expanding {} ({})",
            page.url,
            parsed.title.as_deref().unwrap_or("untitled")
        );

        if self.config.crawl.download_body {
            let stylesheets = self
                .extract(session, &page.url, &parsed, TagKind::Stylesheet, false)
                .await;
            for item in stylesheets {
                self.fetch_stylesheet(session, item).await;
            }

            let anchors = self
                .extract(session, &page.url, &parsed, TagKind::Link, true)
                .await;
            for item in anchors {
                self.fetch_page(session, item, next, keep_pages).await;
            }
        }

        if self.config.crawl.download_content {
            let images = self
                .extract(session, &page.url, &parsed, TagKind::Image, true)
                .await;
            for item in images {
                self.fetch_image(session, item).await;
            }
        }
    }

    async fn extract(
        &self,
        session: &mut Session,
        page_url: &str,
        parsed: &ParsedPage,
        kind: TagKind,
        cut: bool,
    ) -> Vec<FrontierItem> {
        let items = {
            let ctx = ExtractionContext {
                page_url,
                seed_url: &session.seed_url,
                root_url: &session.root_url,
                site_map: &session.outcome.site_map,
                history: &session.downloaded,
                robots: &session.robots,
            };
            self.extractor
                .extract(parsed.references(kind), kind, cut, &ctx)
                .await
        };

        for item in &items {
            session.outcome.site_map.schedule(&item.target_url);
        }
        items
    }

    /// Fetches a target, records the attempt and classifies it in check mode
    async fn fetch_item(&mut self, session: &mut Session, item: &FrontierItem) -> Option<Page> {
        let outcome = self
            .engine
            .fetch(&item.target_url, Some(item.source_url.as_str()))
            .await;
        session.remember(&item.target_url);

        if self.check_only() {
            let status = match &outcome {
                FetchOutcome::Success(_) => CheckStatus::Exists,
                FetchOutcome::Status { status, .. } => CheckStatus::from_status(*status),
                FetchOutcome::Unreachable { .. } => CheckStatus::Not,
            };
            session
                .outcome
                .checks
                .push((item.target_url.clone(), status));
            session
                .outcome
                .site_map
                .insert(&item.target_url, status.as_str());
            session.outcome.stats.checked += 1;
        }

        match outcome {
            FetchOutcome::Success(page) => Some(page),
            FetchOutcome::Status { .. } => {
                session.outcome.stats.status_failures += 1;
                None
            }
            FetchOutcome::Unreachable { .. } => {
                session.outcome.stats.unreachable += 1;
                None
            }
        }
    }

    async fn fetch_page(&mut self, session: &mut Session, item: FrontierItem, next: &mut Frontier, keep_pages: bool) {
        let Some(page) = self.fetch_item(session, &item).await else {
            return;
        };

        if !self.check_only() {
            let number = session.take_number();
            match self.saver.save(&session.format, &page.final_url, &page.body, number) {
                Ok(local) => {
                    session.outcome.site_map.insert(&item.reference, &local);
                    session.outcome.stats.pages_saved += 1;
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    session.outcome.stats.write_failures += 1;
                    return;
                }
            }
        }

        if keep_pages && is_html(&page) {
            next.push(FrontierPage {
                url: page.final_url.clone(),
                body: page.text(),
            });
        }
    }

    async fn fetch_stylesheet(&mut self, session: &mut Session, item: FrontierItem) {
        if let Some(local) = session
            .styles
            .as_mut()
            .and_then(|styles| styles.lookup(&item.target_url))
        {
            tracing::info!("Reusing {} for {}", local, item.target_url);
            session.outcome.site_map.insert(&item.reference, &local);
            session.outcome.stats.stylesheets_reused += 1;
            return;
        }

        let Some(page) = self.fetch_item(session, &item).await else {
            return;
        };
        if self.check_only() {
            return;
        }

        match self.saver.save(&self.styles_format, &item.target_url, &page.body, 0) {
            Ok(local) => {
                if let Some(styles) = session.styles.as_mut() {
                    styles.store(&item.target_url, &local, &page.body);
                }
                session.outcome.site_map.insert(&item.reference, &local);
                session.outcome.stats.stylesheets_saved += 1;
            }
            Err(e) => {
                tracing::error!("{}", e);
                session.outcome.stats.write_failures += 1;
            }
        }
    }

    async fn fetch_image(&mut self, session: &mut Session, item: FrontierItem) {
        let Some(page) = self.fetch_item(session, &item).await else {
            return;
        };
        if self.check_only() {
            return;
        }

        let number = session.take_number();
        match self.saver.save(&session.format, &page.final_url, &page.body, number) {
            Ok(local) => {
                session.outcome.site_map.insert(&item.reference, &local);
                session.outcome.images.push(local);
                session.outcome.stats.images_saved += 1;
            }
            Err(e) => {
                tracing::error!("{}", e);
                session.outcome.stats.write_failures += 1;
            }
        }
    }
}

/// Pages without a Content-Type are assumed to be HTML
fn is_html(page: &Page) -> bool {
    match &page.content_type {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("html") || ct.contains("xml")
        }
        None => true,
    }
}

/// Crawls one seed and rewrites the saved files
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `seed` - Absolute http(s) URL to start from
/// * `confirm` - Answers overwrite and write-failure questions
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sumi_mirror::config::Config;
/// use sumi_mirror::output::FixedAnswer;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = sumi_mirror::mirror(Config::default(), "https://example.com/", Arc::new(FixedAnswer(true))).await?;
/// println!("{} reference(s) mapped", outcome.site_map.len());
/// # Ok(())
/// # }
/// ```
pub async fn mirror(config: Config, seed: &str, confirm: Arc<dyn Confirm>) -> Result<CrawlOutcome> {
    let mut crawler = Crawler::new(config, confirm)?;
    let mut outcome = crawler.run(seed).await?;
    crawler.rewrite(&mut outcome).await?;
    Ok(outcome)
}
