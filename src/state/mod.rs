//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: where the orchestrator is in a run
//! - `CrawlSession`: discovered URLs, processed identifiers, records and counters
//! - `Record`: one scraped listing
//! - `ScrapeOutcome`: the result of one detail scrape

mod outcome;
mod phase;
mod record;
mod session;

// Re-export main types
pub use outcome::{ScrapeFailure, ScrapeOutcome};
pub use phase::CrawlPhase;
pub use record::Record;
pub use session::{CrawlSession, SessionCounters};
