//! Statistics over a set of scraped records
//!
//! Computed once at the end of a run and logged next to the run summary.

use crate::state::Record;
use std::collections::HashMap;

const TOP_CATEGORY_COUNT: usize = 5;

/// Field coverage and category distribution of a record set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStatistics {
    /// Number of records
    pub total: usize,

    /// Records with a revealed phone number
    pub with_phone: usize,

    /// Records with a price
    pub with_price: usize,

    /// Records with a location
    pub with_location: usize,

    /// Most frequent categories, most frequent first
    pub top_categories: Vec<(String, usize)>,
}

impl RecordStatistics {
    pub fn from_records(records: &[Record]) -> Self {
        let mut category_counts: HashMap<&str, usize> = HashMap::new();
        for category in records.iter().flat_map(|r| r.categories.iter()) {
            *category_counts.entry(category.as_str()).or_default() += 1;
        }

        let mut top_categories: Vec<(String, usize)> = category_counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        // Ties broken by name so the listing is stable
        top_categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_categories.truncate(TOP_CATEGORY_COUNT);

        Self {
            total: records.len(),
            with_phone: records.iter().filter(|r| !r.phone.is_empty()).count(),
            with_price: records.iter().filter(|r| !r.price.is_empty()).count(),
            with_location: records.iter().filter(|r| !r.location.is_empty()).count(),
            top_categories,
        }
    }

    /// Share of records with a phone number, as a percentage
    pub fn phone_rate(&self) -> f64 {
        percentage(self.with_phone, self.total)
    }

    pub fn price_rate(&self) -> f64 {
        percentage(self.with_price, self.total)
    }

    pub fn location_rate(&self) -> f64 {
        percentage(self.with_location, self.total)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

/// Logs the statistics at info level
pub fn log_statistics(stats: &RecordStatistics) {
    if stats.total == 0 {
        tracing::info!("No records collected");
        return;
    }

    tracing::info!(
        "Records: {} | with phone: {} ({:.1}%) | with price: {} ({:.1}%) | with location: {} ({:.1}%)",
        stats.total,
        stats.with_phone,
        stats.phone_rate(),
        stats.with_price,
        stats.price_rate(),
        stats.with_location,
        stats.location_rate()
    );

    for (category, count) in &stats.top_categories {
        tracing::info!("  {}: {}", category, count);
    }
}
