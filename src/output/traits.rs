//! Output writer trait and error types
//!
//! This module defines the interface the coordinator uses to publish records
//! and to keep the intermediate record file that survives an interrupted run.

use crate::state::Record;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write output file: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Which pair of output files a write targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// Results of a completed run
    Final,

    /// Results of a run that was cut short
    Partial,
}

impl OutputTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::Partial => "partial",
        }
    }
}

/// Trait for output writers
///
/// Every write replaces its target file as a whole. Implementations must be
/// thread-safe.
pub trait OutputWriter: Send + Sync {
    /// Writes the records as JSON and CSV to the files for `target`
    fn write_records(&self, records: &[Record], target: OutputTarget) -> OutputResult<()>;

    /// Replaces the intermediate record file
    fn write_intermediate(&self, records: &[Record]) -> OutputResult<()>;

    /// Reads the intermediate record file
    ///
    /// A missing or unreadable file yields an empty list.
    fn read_intermediate(&self) -> Vec<Record>;

    /// Removes the intermediate record file; a missing file is not an error
    fn clear_intermediate(&self) -> OutputResult<()>;
}
