//! Crawler coordinator - run orchestration
//!
//! The coordinator owns the crawl session and drives one run through its
//! phases:
//! - Loading or discarding the checkpoint
//! - Discovering listing URLs, or reusing a frozen list
//! - Scraping detail pages through the pool
//! - Writing final outputs, or partial outputs when cut short

use crate::config::Config;
use crate::crawler::{
    discover_urls, DiscoverySettings, HtmlExtractor, HttpFetcher, PageFetcher, PoolSettings,
    RecordExtractor, ScrapePool,
};
use crate::output::{
    log_statistics, FileOutputWriter, OutputTarget, OutputWriter, RecordStatistics,
};
use crate::state::{CrawlPhase, CrawlSession, SessionCounters};
use crate::storage::{CheckpointStore, CrawlCheckpoint, JsonCheckpointStore};
use crate::HarvestError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Terminal phase the run ended in
    pub phase: CrawlPhase,

    /// Records held at the end of the run, carried-over ones included
    pub records: usize,

    pub counters: SessionCounters,

    /// Size of the URL list the run worked from
    pub discovered: usize,

    /// True if discovery was skipped in favor of a checkpointed URL list
    pub resumed: bool,

    pub elapsed: Duration,
}

/// Where URL preparation left the run
enum Prepared {
    Ready { urls: Vec<String>, resumed: bool },
    Interrupted,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    checkpoints: Box<dyn CheckpointStore>,
    output: Box<dyn OutputWriter>,
    session: CrawlSession,
    phase: CrawlPhase,
    fresh: bool,
}

impl Coordinator {
    /// Creates a coordinator talking to the configured site
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `fresh` - Discard any previous checkpoint instead of resuming
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client or base URL could not be set up
    pub fn new(config: Config, fresh: bool) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::new(&config)?;
        let extractor = HtmlExtractor::from_config(&config)?;
        let checkpoints = JsonCheckpointStore::new(&config.output.checkpoint_path);
        let output = FileOutputWriter::new(&config.output);

        Ok(Self::with_components(
            config,
            Arc::new(fetcher),
            Arc::new(extractor),
            Box::new(checkpoints),
            Box::new(output),
            fresh,
        ))
    }

    /// Creates a coordinator from explicit collaborators
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn RecordExtractor>,
        checkpoints: Box<dyn CheckpointStore>,
        output: Box<dyn OutputWriter>,
        fresh: bool,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            checkpoints,
            output,
            session: CrawlSession::new(),
            phase: CrawlPhase::Init,
            fresh,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Runs until the crawl finishes or Ctrl-C is pressed
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until the crawl finishes or `shutdown` resolves
    ///
    /// An interrupted run returns `Ok` with phase `Interrupted`; its checkpoint
    /// is kept for the next run.
    ///
    /// # Errors
    ///
    /// A worker panic or a failed final write ends the run in `Failed` after
    /// progress has been flushed.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<RunSummary, HarvestError>
    where
        S: Future<Output = ()>,
    {
        let started = Instant::now();
        tokio::pin!(shutdown);

        self.transition(CrawlPhase::DiscoveringOrResuming)?;
        let (urls, resumed) = match self.prepare_urls(shutdown.as_mut()).await {
            Prepared::Ready { urls, resumed } => (urls, resumed),
            Prepared::Interrupted => {
                self.transition(CrawlPhase::Interrupted)?;
                self.flush_progress();
                return Ok(self.finish(started, false));
            }
        };

        if urls.is_empty() {
            tracing::warn!("No listing URLs found, nothing to scrape");
            if let Err(e) = self.checkpoints.clear() {
                tracing::warn!("Failed to remove checkpoint: {}", e);
            }
            self.transition(CrawlPhase::Done)?;
            return Ok(self.finish(started, resumed));
        }

        self.transition(CrawlPhase::Scraping)?;
        let pool = ScrapePool::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            PoolSettings::from(&self.config.crawler),
        );
        let checkpoints = self.checkpoints.as_ref();
        let output = self.output.as_ref();
        let scraped = pool
            .scrape_all(
                &urls,
                &mut self.session,
                |session| persist_progress(checkpoints, output, session),
                shutdown.as_mut(),
            )
            .await;

        match scraped {
            Ok(report) if report.interrupted => {
                self.transition(CrawlPhase::Interrupted)?;
                self.flush_progress();
                self.write_partial();
            }
            Ok(_) => {
                self.transition(CrawlPhase::Finalizing)?;
                if let Err(e) = self.finalize() {
                    tracing::error!("Failed to write final outputs: {}", e);
                    self.transition(CrawlPhase::Failed)?;
                    self.flush_progress();
                    return Err(e);
                }
                self.transition(CrawlPhase::Done)?;
            }
            Err(e) => {
                tracing::error!("Scraping failed: {}", e);
                self.transition(CrawlPhase::Failed)?;
                self.flush_progress();
                self.write_partial();
                return Err(e);
            }
        }

        Ok(self.finish(started, resumed))
    }

    /// Resumes from a frozen URL list, or discovers a new one
    async fn prepare_urls<S>(&mut self, shutdown: Pin<&mut S>) -> Prepared
    where
        S: Future<Output = ()>,
    {
        let checkpoint = if self.fresh {
            tracing::info!("Starting fresh, discarding previous progress");
            if let Err(e) = self.checkpoints.clear() {
                tracing::warn!("Failed to remove checkpoint: {}", e);
            }
            if let Err(e) = self.output.clear_intermediate() {
                tracing::warn!("Failed to remove intermediate file: {}", e);
            }
            None
        } else {
            self.checkpoints.load()
        };

        if let Some(checkpoint) = &checkpoint {
            self.session
                .restore_processed(checkpoint.scraped_ids.iter().cloned());
            tracing::info!(
                "Restored {} processed listings from checkpoint",
                checkpoint.scraped_ids.len()
            );
        }

        if let Some(urls) = checkpoint.as_ref().and_then(|c| c.frozen_urls()) {
            tracing::info!("Resuming with {} collected URLs", urls.len());
            self.session.freeze_with(urls.to_vec());
            self.carry_over_records();
            return Prepared::Ready {
                urls: self.session.discovered_urls().to_vec(),
                resumed: true,
            };
        }

        self.save_checkpoint(&CrawlCheckpoint::discovering(
            self.session.processed_sorted(),
        ));

        let settings = DiscoverySettings::from(&self.config.crawler);
        let discovered = tokio::select! {
            biased;

            _ = shutdown => None,
            urls = discover_urls(
                self.fetcher.as_ref(),
                self.extractor.as_ref(),
                &settings,
                &mut self.session,
            ) => Some(urls),
        };

        let Some(urls) = discovered else {
            tracing::warn!("Interrupted during discovery");
            return Prepared::Interrupted;
        };

        self.session.freeze();
        if !urls.is_empty() {
            self.save_checkpoint(&CrawlCheckpoint::urls_collected(
                urls.clone(),
                self.session.processed_sorted(),
            ));
        }

        Prepared::Ready {
            urls,
            resumed: false,
        }
    }

    /// Brings back records of processed listings from the intermediate file
    fn carry_over_records(&mut self) {
        let carried: Vec<_> = self
            .output
            .read_intermediate()
            .into_iter()
            .filter(|record| self.session.is_processed(&record.listing_id))
            .collect();

        let mut restored = 0;
        for record in carried {
            if self.session.push_record(record) {
                restored += 1;
            }
        }

        if restored > 0 {
            tracing::info!("Carried over {} records from the previous run", restored);
        }
    }

    fn finalize(&mut self) -> Result<(), HarvestError> {
        let records = self.session.ordered_records();
        self.output.write_records(&records, OutputTarget::Final)?;

        if let Err(e) = self.output.clear_intermediate() {
            tracing::warn!("Failed to remove intermediate file: {}", e);
        }
        if let Err(e) = self.checkpoints.clear() {
            tracing::warn!("Failed to remove checkpoint: {}", e);
        }
        Ok(())
    }

    fn flush_progress(&self) {
        persist_progress(
            self.checkpoints.as_ref(),
            self.output.as_ref(),
            &self.session,
        );
    }

    fn write_partial(&self) {
        if self.session.records().is_empty() {
            return;
        }
        let records = self.session.ordered_records();
        if let Err(e) = self.output.write_records(&records, OutputTarget::Partial) {
            tracing::warn!("Failed to write partial outputs: {}", e);
        }
    }

    fn save_checkpoint(&self, checkpoint: &CrawlCheckpoint) {
        if let Err(e) = self.checkpoints.save(checkpoint) {
            tracing::warn!("Failed to save checkpoint: {}", e);
        }
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn finish(&self, started: Instant, resumed: bool) -> RunSummary {
        let summary = RunSummary {
            phase: self.phase,
            records: self.session.records().len(),
            counters: self.session.counters(),
            discovered: self.session.discovered_urls().len(),
            resumed,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Run {} in {:.1}s: {} records from {} URLs (succeeded: {}, failed: {}, timed out: {}, skipped: {})",
            summary.phase,
            summary.elapsed.as_secs_f64(),
            summary.records,
            summary.discovered,
            summary.counters.succeeded,
            summary.counters.failed,
            summary.counters.timed_out,
            summary.counters.skipped
        );
        log_statistics(&RecordStatistics::from_records(self.session.records()));

        if self.phase.is_cut_short() {
            tracing::info!("Progress saved; run again to resume");
        }

        summary
    }
}

/// Saves the intermediate records and a checkpoint matching the session
///
/// Failures are logged; persistence never aborts a run.
fn persist_progress(
    checkpoints: &dyn CheckpointStore,
    output: &dyn OutputWriter,
    session: &CrawlSession,
) {
    if !session.records().is_empty() {
        if let Err(e) = output.write_intermediate(session.records()) {
            tracing::warn!("Failed to write intermediate results: {}", e);
        }
    }

    let checkpoint = if session.is_frozen() {
        CrawlCheckpoint::urls_collected(
            session.discovered_urls().to_vec(),
            session.processed_sorted(),
        )
    } else {
        CrawlCheckpoint::discovering(session.processed_sorted())
    };

    if let Err(e) = checkpoints.save(&checkpoint) {
        tracing::warn!("Failed to save checkpoint: {}", e);
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::warn!("Interrupted by user, saving progress"),
        Err(e) => {
            tracing::warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
