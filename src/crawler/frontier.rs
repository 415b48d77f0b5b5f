//! Per-level crawl frontier
//!
//! The crawl proceeds level by level. The pages fetched while expanding one
//! level form the frontier of the next, so each level owns its own queue.

use crate::crawler::parser::TagKind;
use std::collections::VecDeque;

/// A target accepted by the extractor and waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    /// Page the reference was found on
    pub source_url: String,
    /// Reference as written in the markup
    pub reference: String,
    /// Resolved absolute URL, query stripped
    pub target_url: String,
    pub kind: TagKind,
}

/// A fetched page waiting to be expanded
#[derive(Debug, Clone)]
pub struct FrontierPage {
    /// Final URL of the page
    pub url: String,
    /// Decoded body
    pub body: String,
}

/// Pages to expand at one hierarchy level
#[derive(Debug, Default)]
pub struct Frontier {
    depth: u32,
    pages: VecDeque<FrontierPage>,
}

impl Frontier {
    /// The level below the seed page
    pub fn seed(page: FrontierPage) -> Self {
        Self {
            depth: 0,
            pages: VecDeque::from([page]),
        }
    }

    /// An empty frontier for the level after this one
    pub fn next_level(&self) -> Self {
        Self {
            depth: self.depth + 1,
            pages: VecDeque::new(),
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn push(&mut self, page: FrontierPage) {
        self.pages.push_back(page);
    }

    pub fn pop(&mut self) -> Option<FrontierPage> {
        self.pages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
