//! Classification of a single detail scrape
//!
//! The marking policy lives here: it decides which outcomes settle a listing
//! for good and which leave it for the next run.

use crate::crawler::{ExtractionError, FetchError};
use crate::state::Record;

/// Why a detail scrape produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeFailure {
    /// The detail page was never obtained; a later run may retry it
    Fetch(FetchError),

    /// The page was fetched but held nothing usable; never retried
    Extraction(ExtractionError),
}

/// Result of attempting one detail scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Record(Box<Record>),

    /// Identifier already processed, no request made
    Skipped,

    Failed(ScrapeFailure),

    /// The per-item deadline expired before the task finished
    TimedOut,
}

impl ScrapeOutcome {
    /// Returns true if this outcome settles the identifier for good
    ///
    /// Successes and extraction failures are definitive. Fetch failures and
    /// timeouts stay eligible for a future run.
    pub fn marks_processed(&self) -> bool {
        matches!(
            self,
            Self::Record(_) | Self::Failed(ScrapeFailure::Extraction(_))
        )
    }
}
