//! URL discovery across the paginated listing
//!
//! Pages are visited strictly in offset order, one at a time. Discovery ends
//! after a run of pages that contribute no new URLs, or at the page limit.

use crate::config::CrawlerConfig;
use crate::crawler::{FetchError, PageFetcher, RecordExtractor};
use crate::state::CrawlSession;
use std::time::Duration;

/// Limits and pacing for discovery
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub max_pages: u32,
    pub empty_page_threshold: u32,
    pub page_delay: Duration,
    pub page_timeout: Duration,
}

impl From<&CrawlerConfig> for DiscoverySettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            empty_page_threshold: config.empty_page_threshold,
            page_delay: config.page_delay(),
            page_timeout: config.request_timeout(),
        }
    }
}

/// Walks the listing pages and collects unique item URLs into `session`
///
/// A page counts as empty when it fails to load or contributes no URL that
/// is not already known. Failures never stop discovery early on their own;
/// they only advance the empty-page counter.
///
/// Returns the session's discovered URLs in discovery order.
pub async fn discover_urls(
    fetcher: &dyn PageFetcher,
    extractor: &dyn RecordExtractor,
    settings: &DiscoverySettings,
    session: &mut CrawlSession,
) -> Vec<String> {
    tracing::info!(
        "Fetching listing pages (max {} pages)...",
        settings.max_pages
    );

    let mut offset = 0;
    let mut consecutive_empty = 0;

    while offset < settings.max_pages && consecutive_empty < settings.empty_page_threshold {
        let page = tokio::time::timeout(settings.page_timeout, fetcher.fetch_listing_page(offset))
            .await
            .unwrap_or(Err(FetchError::Timeout));

        match page {
            Ok(html) => {
                let new_urls = extractor
                    .extract_listing_links(&html)
                    .iter()
                    .filter(|url| session.insert_discovered(url))
                    .count();

                if new_urls > 0 {
                    consecutive_empty = 0;
                    tracing::info!(
                        "Page {}/{}: found {} new listings (total: {})",
                        offset + 1,
                        settings.max_pages,
                        new_urls,
                        session.discovered_urls().len()
                    );
                } else {
                    consecutive_empty += 1;
                    tracing::info!(
                        "Page {}/{}: no new listings (consecutive: {}/{})",
                        offset + 1,
                        settings.max_pages,
                        consecutive_empty,
                        settings.empty_page_threshold
                    );
                }
            }
            Err(e) => {
                consecutive_empty += 1;
                tracing::warn!(
                    "Page {}/{}: failed to fetch ({}) (consecutive: {}/{})",
                    offset + 1,
                    settings.max_pages,
                    e,
                    consecutive_empty,
                    settings.empty_page_threshold
                );
            }
        }

        offset += 1;
        tokio::time::sleep(settings.page_delay).await;
    }

    if consecutive_empty >= settings.empty_page_threshold {
        tracing::info!(
            "Stopped: {} consecutive pages with no new listings",
            settings.empty_page_threshold
        );
    } else {
        tracing::info!("Stopped: reached max pages limit ({})", settings.max_pages);
    }

    tracing::info!(
        "Total unique listings found: {}",
        session.discovered_urls().len()
    );

    session.discovered_urls().to_vec()
}
