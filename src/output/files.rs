//! File-based output
//!
//! Records are written as a pretty-printed JSON array and as a CSV table with
//! a fixed column order. Categories stay a list in JSON and are joined with
//! ", " in CSV.

use crate::config::OutputConfig;
use crate::output::{OutputResult, OutputTarget, OutputWriter};
use crate::state::Record;
use crate::storage::write_atomic;
use std::path::{Path, PathBuf};

/// CSV header, in column order
pub const CSV_COLUMNS: [&str; 11] = [
    "listing_id",
    "title",
    "categories",
    "price",
    "phone",
    "user_name",
    "user_id",
    "location",
    "date",
    "description",
    "url",
];

/// `OutputWriter` that writes to the paths named in the output config
#[derive(Debug, Clone)]
pub struct FileOutputWriter {
    json_path: PathBuf,
    csv_path: PathBuf,
    partial_json_path: PathBuf,
    partial_csv_path: PathBuf,
    intermediate_path: PathBuf,
}

impl FileOutputWriter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            json_path: PathBuf::from(&config.json_path),
            csv_path: PathBuf::from(&config.csv_path),
            partial_json_path: PathBuf::from(&config.partial_json_path),
            partial_csv_path: PathBuf::from(&config.partial_csv_path),
            intermediate_path: PathBuf::from(&config.intermediate_path),
        }
    }

    fn paths(&self, target: OutputTarget) -> (&Path, &Path) {
        match target {
            OutputTarget::Final => (self.json_path.as_path(), self.csv_path.as_path()),
            OutputTarget::Partial => (
                self.partial_json_path.as_path(),
                self.partial_csv_path.as_path(),
            ),
        }
    }
}

impl OutputWriter for FileOutputWriter {
    fn write_records(&self, records: &[Record], target: OutputTarget) -> OutputResult<()> {
        let (json_path, csv_path) = self.paths(target);

        write_atomic(json_path, &encode_json(records)?)?;
        write_atomic(csv_path, &encode_csv(records)?)?;

        tracing::info!(
            "Saved {} {} records to {} and {}",
            records.len(),
            target.as_str(),
            json_path.display(),
            csv_path.display()
        );
        Ok(())
    }

    fn write_intermediate(&self, records: &[Record]) -> OutputResult<()> {
        write_atomic(&self.intermediate_path, &encode_json(records)?)?;
        tracing::debug!(
            "Intermediate file updated with {} records",
            records.len()
        );
        Ok(())
    }

    fn read_intermediate(&self) -> Vec<Record> {
        let content = match std::fs::read_to_string(&self.intermediate_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(
                    "Could not read intermediate file {}: {}",
                    self.intermediate_path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt intermediate file {}: {}",
                    self.intermediate_path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn clear_intermediate(&self) -> OutputResult<()> {
        match std::fs::remove_file(&self.intermediate_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Encodes records as a pretty-printed JSON array
pub fn encode_json(records: &[Record]) -> OutputResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Encodes records as CSV with the `CSV_COLUMNS` header
pub fn encode_csv(records: &[Record]) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for record in records {
        let categories = record.categories_joined();
        writer.write_record([
            record.listing_id.as_str(),
            record.title.as_str(),
            categories.as_str(),
            record.price.as_str(),
            record.phone.as_str(),
            record.user_name.as_str(),
            record.user_id.as_str(),
            record.location.as_str(),
            record.date.as_str(),
            record.description.as_str(),
            record.url.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}
