//! State module for one mirror run
//!
//! # Components
//!
//! - `SiteMap`: reference → local path mapping owned by the crawler
//! - `CheckStatus`: the per-URL verdict of check-only mode

mod check;
mod site_map;

// Re-export main types
pub use check::CheckStatus;
pub use site_map::SiteMap;
