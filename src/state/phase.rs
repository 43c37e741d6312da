/// Orchestrator phase definitions
///
/// A run moves through these phases in order; `Interrupted` and `Failed` are
/// absorbing states entered when a run is cut short.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Components are built, nothing has been loaded yet
    Init,

    /// Loading a checkpoint or enumerating listing pages
    DiscoveringOrResuming,

    /// Detail pages are being fetched
    Scraping,

    /// Writing final outputs and removing transient files
    Finalizing,

    // ===== Terminal States =====
    /// Run completed
    Done,

    /// Run stopped by the user; checkpoint preserved
    Interrupted,

    /// Run stopped by an unrecoverable error; checkpoint preserved
    Failed,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Interrupted | Self::Failed)
    }

    /// Returns true if the run ended before finishing its work
    pub fn is_cut_short(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Failed)
    }

    /// Returns true if moving from this phase to `next` is allowed
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (self, next),
            (Init, DiscoveringOrResuming)
                | (DiscoveringOrResuming, Scraping)
                | (DiscoveringOrResuming, Done)
                | (DiscoveringOrResuming, Interrupted)
                | (DiscoveringOrResuming, Failed)
                | (Scraping, Finalizing)
                | (Scraping, Interrupted)
                | (Scraping, Failed)
                | (Finalizing, Done)
                | (Finalizing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DiscoveringOrResuming => "discovering_or_resuming",
            Self::Scraping => "scraping",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
