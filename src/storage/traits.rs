//! Checkpoint store trait and error types

use crate::storage::CrawlCheckpoint;
use thiserror::Error;

/// Errors that can occur while persisting a checkpoint
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of the crawl checkpoint
///
/// Implementations must replace the stored checkpoint as a whole: a reader
/// sees either the previous checkpoint or the new one, never a mix.
pub trait CheckpointStore: Send + Sync {
    /// Replaces the stored checkpoint
    fn save(&self, checkpoint: &CrawlCheckpoint) -> StorageResult<()>;

    /// Returns the stored checkpoint
    ///
    /// Missing, unreadable, unparseable or inconsistent checkpoints all
    /// yield `None`; the caller starts fresh.
    fn load(&self) -> Option<CrawlCheckpoint>;

    /// Removes the stored checkpoint; a missing checkpoint is not an error
    fn clear(&self) -> StorageResult<()>;
}
