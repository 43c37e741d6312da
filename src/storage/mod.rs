//! Storage module for persisting crawl progress
//!
//! This module handles the crash-safe checkpoint that lets a restarted run
//! skip discovery and already-scraped listings, including:
//! - The checkpoint file format
//! - Whole-file atomic replacement
//! - Permissive loading (anything unreadable means "start fresh")

mod checkpoint;
mod traits;

pub use checkpoint::{CheckpointStage, CrawlCheckpoint, JsonCheckpointStore};
pub use traits::{CheckpointStore, StorageError, StorageResult};

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` by replacing the file as a whole
///
/// The content goes to a temporary file in the same directory which is then
/// renamed over the target, so an interrupted write leaves the previous
/// version intact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| StorageError::Persist {
        path: path.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}
