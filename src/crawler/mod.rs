//! Crawler module for recursive mirroring
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retries and request pacing
//! - HTML parsing and reference collection
//! - Link filtering against the crawl policy
//! - Level-by-level crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod parser;
mod throttle;

pub use coordinator::{mirror, CrawlOutcome, Crawler};
pub use extractor::{DnsProbe, ExtractionContext, LinkExtractor};
pub use fetcher::{build_http_client, with_retries, FetchEngine, FetchOutcome, Page};
pub use frontier::{Frontier, FrontierItem, FrontierPage};
pub use parser::{collect_references, parse_html, ParsedPage, TagKind, TagSpec, ANCHORS, IMAGES, STYLESHEETS};
pub use throttle::Throttle;
