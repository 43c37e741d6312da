//! Bounded-concurrency detail scraping
//!
//! A fixed set of workers drains a shared job queue. Each job needs a permit
//! from the admission gate before it touches the network, and reports its
//! outcome over a channel. The coordinating task consumes outcomes in
//! completion order and is the only writer of the crawl session.

use crate::config::CrawlerConfig;
use crate::crawler::{FetchError, PageFetcher, RecordExtractor};
use crate::state::{CrawlSession, ScrapeFailure, ScrapeOutcome};
use crate::url::{listing_identifier, ListingIdentifier};
use crate::HarvestError;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;

/// Concurrency, pacing and flush cadence of the pool
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub concurrency: usize,
    pub task_timeout: Duration,
    pub task_delay: Duration,
    pub flush_interval: usize,
}

impl From<&CrawlerConfig> for PoolSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            concurrency: config.max_concurrent_requests as usize,
            task_timeout: config.request_timeout(),
            task_delay: config.task_delay(),
            flush_interval: config.flush_interval as usize,
        }
    }
}

/// One URL waiting for a worker
#[derive(Debug, Clone)]
struct ScrapeJob {
    url: String,
    id: ListingIdentifier,
}

/// What a `scrape_all` call did
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Outcomes in completion order; skips come first
    pub outcomes: Vec<(ListingIdentifier, ScrapeOutcome)>,

    /// True if the shutdown signal stopped the pool early
    pub interrupted: bool,
}

impl ScrapeReport {
    /// Number of jobs that went to the network
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, ScrapeOutcome::Skipped))
            .count()
    }
}

/// Detail scrape pool
pub struct ScrapePool {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    settings: PoolSettings,
}

impl ScrapePool {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn RecordExtractor>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            settings,
        }
    }

    /// Scrapes every URL whose identifier is not yet processed
    ///
    /// Outcomes are folded into `session` as they complete. `flush` runs
    /// every `flush_interval` completions and after the last one. When
    /// `shutdown` resolves, outcomes already delivered are absorbed and the
    /// remaining workers are aborted.
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::WorkerPanicked` if a worker task panicked. All
    /// outcomes delivered before the panic are already in `session`.
    pub async fn scrape_all<F, S>(
        &self,
        urls: &[String],
        session: &mut CrawlSession,
        mut flush: F,
        shutdown: S,
    ) -> Result<ScrapeReport, HarvestError>
    where
        F: FnMut(&CrawlSession),
        S: Future<Output = ()>,
    {
        let total = urls.len();
        let flush_interval = self.settings.flush_interval.max(1);
        let mut report = ScrapeReport::default();
        let mut completed = 0usize;

        // Resume fast path: settled identifiers never reach the network
        let mut queued = HashSet::new();
        let mut jobs = VecDeque::new();
        for url in urls {
            let id = listing_identifier(url);
            if session.is_processed(&id) || queued.contains(&id) {
                session.absorb(&id, &ScrapeOutcome::Skipped);
                report.outcomes.push((id, ScrapeOutcome::Skipped));
                completed += 1;
                continue;
            }
            queued.insert(id.clone());
            jobs.push_back(ScrapeJob {
                url: url.clone(),
                id,
            });
        }

        tracing::info!(
            "Scraping {} listings ({} already processed, max {} concurrent)...",
            jobs.len(),
            completed,
            self.settings.concurrency
        );

        if jobs.is_empty() {
            if completed > 0 {
                flush(session);
            }
            return Ok(report);
        }

        let workers_needed = self.settings.concurrency.max(1).min(jobs.len());
        let queue = Arc::new(Mutex::new(jobs));
        let gate = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for _ in 0..workers_needed {
            workers.spawn(run_worker(
                Arc::clone(&queue),
                Arc::clone(&gate),
                results_tx.clone(),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.extractor),
                self.settings.clone(),
            ));
        }
        drop(results_tx);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                received = results_rx.recv() => {
                    let Some((id, outcome)) = received else {
                        break;
                    };
                    session.absorb(&id, &outcome);
                    report.outcomes.push((id, outcome));
                    completed += 1;

                    if completed % flush_interval == 0 || completed == total {
                        let counters = session.counters();
                        tracing::info!(
                            "Progress: {}/{} | Success: {} | Failed: {}",
                            completed,
                            total,
                            counters.succeeded,
                            counters.failed
                        );
                        flush(session);
                    }
                }

                _ = &mut shutdown => {
                    tracing::warn!(
                        "Shutdown requested with {}/{} listings completed",
                        completed,
                        total
                    );
                    report.interrupted = true;
                    break;
                }
            }
        }

        if report.interrupted {
            workers.abort_all();
        }

        let mut panicked = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!("Scrape worker panicked: {}", e);
                    panicked = Some(e.to_string());
                }
            }
        }

        if let Some(message) = panicked {
            return Err(HarvestError::WorkerPanicked(message));
        }

        let counters = session.counters();
        tracing::info!(
            "Scraping {}: Success: {} | Failed: {} | Skipped: {}",
            if report.interrupted { "interrupted" } else { "completed" },
            counters.succeeded,
            counters.failed,
            counters.skipped
        );

        Ok(report)
    }
}

/// Pulls jobs until the queue is empty or the results channel closes
async fn run_worker(
    queue: Arc<Mutex<VecDeque<ScrapeJob>>>,
    gate: Arc<Semaphore>,
    results: mpsc::UnboundedSender<(ListingIdentifier, ScrapeOutcome)>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    settings: PoolSettings,
) {
    loop {
        let next = queue.lock().await.pop_front();
        let Some(job) = next else {
            break;
        };

        // Held until the post-task delay has elapsed; released on every path
        let Ok(_permit) = Arc::clone(&gate).acquire_owned().await else {
            break;
        };

        let outcome = match tokio::time::timeout(
            settings.task_timeout,
            scrape_listing(fetcher.as_ref(), extractor.as_ref(), &job),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("Timeout: {}", job.url);
                ScrapeOutcome::TimedOut
            }
        };

        if results.send((job.id, outcome)).is_err() {
            break;
        }

        tokio::time::sleep(settings.task_delay).await;
    }
}

/// Fetches, extracts and enriches one listing
async fn scrape_listing(
    fetcher: &dyn PageFetcher,
    extractor: &dyn RecordExtractor,
    job: &ScrapeJob,
) -> ScrapeOutcome {
    let html = match fetcher.fetch_detail_page(&job.url).await {
        Ok(html) => html,
        Err(FetchError::Timeout) => {
            tracing::warn!("Timeout: {}", job.url);
            return ScrapeOutcome::TimedOut;
        }
        Err(e) => {
            tracing::warn!("Error scraping {}: {}", job.url, e);
            return ScrapeOutcome::Failed(ScrapeFailure::Fetch(e));
        }
    };

    let extracted = match extractor.extract_record(&html, &job.url, &job.id) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::debug!("No usable content at {}: {}", job.url, e);
            return ScrapeOutcome::Failed(ScrapeFailure::Extraction(e));
        }
    };

    let mut record = extracted.record;
    if job.id.is_numeric() {
        if let Some(token) = extracted.phone_token {
            match fetcher.fetch_phone(&job.id, &token).await {
                Ok(phone) => record.phone = phone,
                Err(e) => tracing::debug!("Phone lookup failed for {}: {}", job.id, e),
            }
        }
    }

    ScrapeOutcome::Record(Box::new(record))
}
