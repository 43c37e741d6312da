//! In-memory state of one crawl run
//!
//! The orchestrator owns the session and lends it to discovery and the
//! scrape pool. Both sets only ever grow, and only the coordinating task
//! mutates them.

use crate::state::{Record, ScrapeFailure, ScrapeOutcome};
use crate::url::ListingIdentifier;
use std::collections::{HashMap, HashSet};

/// Progress counters reported while scraping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub succeeded: u64,
    /// Fetch failures, extraction failures and timeouts
    pub failed: u64,
    pub timed_out: u64,
    pub skipped: u64,
}

impl SessionCounters {
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }
}

/// Aggregate state for one crawl run
#[derive(Debug, Default)]
pub struct CrawlSession {
    discovered: Vec<String>,
    discovered_set: HashSet<String>,
    frozen: bool,
    processed: HashSet<ListingIdentifier>,
    records: Vec<Record>,
    record_ids: HashSet<ListingIdentifier>,
    counters: SessionCounters,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Discovery =====

    /// Adds a URL to the discovered set
    ///
    /// Returns false if the URL was already known or the set is frozen.
    pub fn insert_discovered(&mut self, url: &str) -> bool {
        if self.frozen {
            tracing::warn!("Ignoring {} discovered after the URL list was frozen", url);
            return false;
        }
        if !self.discovered_set.insert(url.to_string()) {
            return false;
        }
        self.discovered.push(url.to_string());
        true
    }

    /// Discovered URLs in discovery order
    pub fn discovered_urls(&self) -> &[String] {
        &self.discovered
    }

    /// Freezes the discovered set; it cannot change afterwards
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Replaces the discovered set with a persisted list and freezes it
    pub fn freeze_with(&mut self, urls: Vec<String>) {
        self.discovered.clear();
        self.discovered_set.clear();
        self.frozen = false;
        for url in &urls {
            self.insert_discovered(url);
        }
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    // ===== Processed identifiers =====

    pub fn is_processed(&self, id: &ListingIdentifier) -> bool {
        self.processed.contains(id)
    }

    /// Returns true if the identifier was not processed before
    pub fn mark_processed(&mut self, id: ListingIdentifier) -> bool {
        self.processed.insert(id)
    }

    pub fn restore_processed<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = ListingIdentifier>,
    {
        self.processed.extend(ids);
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Processed identifiers in sorted order, for stable checkpoint files
    pub fn processed_sorted(&self) -> Vec<ListingIdentifier> {
        let mut ids: Vec<_> = self.processed.iter().cloned().collect();
        ids.sort();
        ids
    }

    // ===== Records =====

    /// Appends a record unless one with the same identifier already exists
    pub fn push_record(&mut self, record: Record) -> bool {
        if !self.record_ids.insert(record.listing_id.clone()) {
            tracing::debug!("Dropping duplicate record {}", record.listing_id);
            return false;
        }
        self.records.push(record);
        true
    }

    /// Records in the order they were accumulated
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records ordered by their URL's position in the discovered list
    ///
    /// Records whose URL is not in the list sort last, by identifier.
    pub fn ordered_records(&self) -> Vec<Record> {
        let position: HashMap<&str, usize> = self
            .discovered
            .iter()
            .enumerate()
            .map(|(i, url)| (url.as_str(), i))
            .collect();

        let mut records = self.records.clone();
        records.sort_by(|a, b| {
            let pa = position.get(a.url.as_str()).copied().unwrap_or(usize::MAX);
            let pb = position.get(b.url.as_str()).copied().unwrap_or(usize::MAX);
            pa.cmp(&pb).then_with(|| a.listing_id.cmp(&b.listing_id))
        });
        records
    }

    // ===== Outcomes =====

    /// Folds one scrape outcome into the session
    pub fn absorb(&mut self, id: &ListingIdentifier, outcome: &ScrapeOutcome) {
        if outcome.marks_processed() {
            self.mark_processed(id.clone());
        }

        match outcome {
            ScrapeOutcome::Record(record) => {
                if self.push_record(record.as_ref().clone()) {
                    self.counters.succeeded += 1;
                } else {
                    self.counters.skipped += 1;
                }
            }
            ScrapeOutcome::Skipped => self.counters.skipped += 1,
            ScrapeOutcome::Failed(ScrapeFailure::Fetch(_))
            | ScrapeOutcome::Failed(ScrapeFailure::Extraction(_)) => self.counters.failed += 1,
            ScrapeOutcome::TimedOut => {
                self.counters.failed += 1;
                self.counters.timed_out += 1;
            }
        }
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }
}
