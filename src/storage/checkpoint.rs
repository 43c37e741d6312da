//! JSON checkpoint file
//!
//! A checkpoint records how far a run got and which listings are settled.
//! Loading is permissive: a missing, unreadable or inconsistent file means
//! starting over.

use crate::storage::{write_atomic, CheckpointStore, StorageResult};
use crate::url::ListingIdentifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How far a run got before the checkpoint was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStage {
    /// Discovery was in progress; no URL list is stored
    Discovering,

    /// Discovery finished; the stored URL list is frozen
    UrlsCollected,
}

/// Persisted crawl progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    pub stage: CheckpointStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,

    #[serde(default)]
    pub scraped_ids: Vec<ListingIdentifier>,

    /// Seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: f64,
}

impl CrawlCheckpoint {
    pub fn discovering(scraped_ids: Vec<ListingIdentifier>) -> Self {
        Self {
            stage: CheckpointStage::Discovering,
            urls: None,
            scraped_ids,
            timestamp: now_timestamp(),
        }
    }

    pub fn urls_collected(urls: Vec<String>, scraped_ids: Vec<ListingIdentifier>) -> Self {
        Self {
            stage: CheckpointStage::UrlsCollected,
            urls: Some(urls),
            scraped_ids,
            timestamp: now_timestamp(),
        }
    }

    /// Returns the frozen URL list, if this checkpoint carries one
    pub fn frozen_urls(&self) -> Option<&[String]> {
        match self.stage {
            CheckpointStage::UrlsCollected => self.urls.as_deref(),
            CheckpointStage::Discovering => None,
        }
    }

    /// A frozen stage without a URL list is never trusted
    pub fn is_consistent(&self) -> bool {
        match self.stage {
            CheckpointStage::UrlsCollected => self.urls.is_some(),
            CheckpointStage::Discovering => true,
        }
    }
}

fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Checkpoint stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&self, checkpoint: &CrawlCheckpoint) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        write_atomic(&self.path, &bytes)?;
        tracing::debug!(
            "Checkpoint saved ({:?}, {} processed) to {}",
            checkpoint.stage,
            checkpoint.scraped_ids.len(),
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Option<CrawlCheckpoint> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read checkpoint {}: {}", self.path.display(), e);
                return None;
            }
        };

        let checkpoint: CrawlCheckpoint = match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!("Ignoring corrupt checkpoint {}: {}", self.path.display(), e);
                return None;
            }
        };

        if !checkpoint.is_consistent() {
            tracing::warn!(
                "Ignoring checkpoint {}: stage is urls_collected but no URL list is stored",
                self.path.display()
            );
            return None;
        }

        Some(checkpoint)
    }

    fn clear(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
