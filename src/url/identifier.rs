//! Listing identifier derivation
//!
//! Identifiers are the deduplication key for detail scraping and the only
//! per-item state stored in a checkpoint. A resumed run recomputes them from
//! the frozen URL list, so derivation must stay a pure function of the URL.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)\.html$").expect("static identifier pattern"));

/// Stable identifier for one listing
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ListingIdentifier(String);

impl ListingIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the numeric site id rather than a URL fallback
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for ListingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Extracts the trailing numeric token from a listing URL
///
/// Returns `None` unless the URL ends with `-<digits>.html`.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::extract_numeric_id;
///
/// assert_eq!(
///     extract_numeric_id("https://ustasi.az/santexnik-xidmeti-48213.html"),
///     Some("48213")
/// );
/// assert_eq!(extract_numeric_id("https://ustasi.az/about"), None);
/// ```
pub fn extract_numeric_id(url: &str) -> Option<&str> {
    TRAILING_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Derives the listing identifier for a URL
///
/// URLs without a trailing numeric token fall back to the full URL string,
/// so every URL maps to exactly one identifier.
pub fn listing_identifier(url: &str) -> ListingIdentifier {
    match extract_numeric_id(url) {
        Some(id) => ListingIdentifier::new(id),
        None => ListingIdentifier::new(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_suffix() {
        let id = listing_identifier("https://ustasi.az/kondisioner-temiri-1234.html");
        assert_eq!(id.as_str(), "1234");
        assert!(id.is_numeric());
    }

    #[test]
    fn test_digits_elsewhere_are_ignored() {
        assert_eq!(
            extract_numeric_id("https://ustasi.az/2024/usta-77.html"),
            Some("77")
        );
        assert_eq!(extract_numeric_id("https://ustasi.az/usta-77.htm"), None);
        assert_eq!(extract_numeric_id("https://ustasi.az/usta77.html"), None);
    }

    #[test]
    fn test_query_string_breaks_match() {
        assert_eq!(
            extract_numeric_id("https://ustasi.az/usta-77.html?ref=home"),
            None
        );
    }

    #[test]
    fn test_fallback_is_full_url() {
        let url = "https://ustasi.az/user/profile";
        let id = listing_identifier(url);
        assert_eq!(id.as_str(), url);
        assert!(!id.is_numeric());
    }

    #[test]
    fn test_derivation_is_stable() {
        let url = "https://ustasi.az/elektrik-ustasi-90001.html";
        assert_eq!(listing_identifier(url), listing_identifier(url));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ListingIdentifier::new("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        let back: ListingIdentifier = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, id);
    }
}
