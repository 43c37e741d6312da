//! Crawler module for listing discovery and detail scraping
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing pages, detail pages and phone numbers
//! - HTML extraction of listing links and records
//! - Serial URL discovery across the paginated listing
//! - The bounded-concurrency detail scrape pool
//! - Overall run coordination

mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod pool;

pub use coordinator::{Coordinator, RunSummary};
pub use discovery::{discover_urls, DiscoverySettings};
pub use extractor::{ExtractedListing, ExtractionError, HtmlExtractor, RecordExtractor};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use pool::{PoolSettings, ScrapePool, ScrapeReport};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete harvest against the configured site
///
/// This is the main entry point for starting a run. It will:
/// 1. Load the checkpoint, or discard it when `fresh` is set
/// 2. Discover listing URLs unless a frozen list was checkpointed
/// 3. Scrape every unprocessed listing
/// 4. Write final outputs, or partial ones if interrupted by Ctrl-C
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished or was interrupted
/// * `Err(HarvestError)` - The run could not start or failed
pub async fn crawl(config: Config, fresh: bool) -> Result<RunSummary, HarvestError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
