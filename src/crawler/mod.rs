//! Crawler module for catalog traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Field extraction from catalog, listing, and detail pages
//! - Pagination walking per category
//! - Bounded-concurrency detail dispatch
//! - Overall crawl coordination

mod coordinator;
mod dispatcher;
pub mod extract;
mod fetcher;
pub mod fields;
mod pagination;

pub use coordinator::{publish_aggregate, Coordinator};
pub use dispatcher::{DetailOutcome, Dispatcher, ImageOutcome};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher, Page};
pub use pagination::{walk_category, ListingWalk, WalkOptions};

pub use crate::output::stats::CrawlReport;

use crate::config::Config;
use crate::CrawlError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client
/// 2. Discover categories on the catalog root
/// 3. Walk and extract every category
/// 4. Write per-category CSVs, the aggregate, and the charts
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `cancel` - Cancelling this token stops the crawl at the next checkpoint
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to the end or was cancelled after discovery
/// * `Err(CrawlError)` - The catalog root could not be used
pub async fn crawl(config: Config, cancel: CancellationToken) -> Result<CrawlReport, CrawlError> {
    let coordinator = Coordinator::new(config, cancel)?;
    coordinator.run().await
}
