//! Scraped listing record

use crate::url::ListingIdentifier;
use serde::{Deserialize, Serialize};

/// One scraped listing
///
/// Every field other than the identifier and source URL may be empty; an
/// element missing from the source document is a normal result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub listing_id: ListingIdentifier,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub phone: String,
    /// Provider display name
    #[serde(default)]
    pub user_name: String,
    /// Provider id taken from the profile link
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub location: String,
    /// Posted date, verbatim from the page
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

impl Record {
    pub fn new(listing_id: ListingIdentifier, url: impl Into<String>) -> Self {
        Self {
            listing_id,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Categories as a single comma-separated string (tabular form)
    pub fn categories_joined(&self) -> String {
        self.categories.join(", ")
    }
}
