//! Output module for publishing scraped records
//!
//! This module handles:
//! - Writing final and partial record sets as JSON and CSV
//! - Keeping the intermediate record file between flushes
//! - Summarizing record coverage at the end of a run

mod files;
pub mod stats;
mod traits;

pub use files::{encode_csv, encode_json, FileOutputWriter, CSV_COLUMNS};
pub use stats::{log_statistics, RecordStatistics};
pub use traits::{OutputError, OutputResult, OutputTarget, OutputWriter};
