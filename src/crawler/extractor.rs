//! HTML extraction of listing links and listing records
//!
//! This module handles parsing the site's HTML to extract:
//! - Item links from a paginated listing page
//! - A structured `Record` from an item's detail page
//! - The token needed to reveal the item's phone number

use crate::config::Config;
use crate::state::Record;
use crate::url::{resolve_link, ListingIdentifier};
use crate::HarvestError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

static CATEGORY_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^/]+$").expect("static category pattern"));

static DATE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tarix:\s*(.+)").expect("static date pattern"));

static PHONE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-h="([a-f0-9]{32})""#).expect("static token pattern"));

const ALL_LISTINGS_SUFFIX: &str = "(Bütün Elanları)";
const LOCATION_MARKERS: [&str; 2] = ["şəhəri", "rayonu"];
const MAX_CATEGORIES: usize = 2;

/// Why a fetched detail page produced no record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no primary content container found")]
    MissingContent,
}

/// A record plus what is needed for the phone side-call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedListing {
    pub record: Record,
    pub phone_token: Option<String>,
}

/// Turns fetched documents into links and records
pub trait RecordExtractor: Send + Sync {
    /// Absolute item URLs found on a listing page, in page order
    fn extract_listing_links(&self, html: &str) -> Vec<String>;

    /// Builds the record for one detail page
    fn extract_record(
        &self,
        html: &str,
        url: &str,
        id: &ListingIdentifier,
    ) -> Result<ExtractedListing, ExtractionError>;
}

/// `RecordExtractor` for the site's HTML layout
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    base_url: Url,
}

impl HtmlExtractor {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        Ok(Self::new(Url::parse(&config.site.base_url)?))
    }
}

impl RecordExtractor for HtmlExtractor {
    fn extract_listing_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut links = Vec::new();

        let (Ok(product_selector), Ok(link_selector)) =
            (Selector::parse("div.nobj.prod"), Selector::parse("a[href]"))
        else {
            return links;
        };

        for product in document.select(&product_selector) {
            let href = product
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"));
            if let Some(absolute) = href.and_then(|h| resolve_link(h, &self.base_url)) {
                links.push(absolute);
            }
        }

        links
    }

    fn extract_record(
        &self,
        html: &str,
        url: &str,
        id: &ListingIdentifier,
    ) -> Result<ExtractedListing, ExtractionError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let content = select_first(root, "div#openhalf").ok_or(ExtractionError::MissingContent)?;

        let mut record = Record::new(id.clone(), url);
        record.title = extract_title(root).unwrap_or_else(|| title_from_url(url));
        record.categories = extract_categories(content);
        record.price = select_text(content, "span.pricecolor");
        record.description = select_text(content, "p.infop100");
        record.date = extract_date(content);

        if let Some(contact) = select_first(content, "div.infocontact") {
            if let Some(user_link) = select_first(contact, "a[href*='/user/']") {
                record.user_name = element_text(user_link)
                    .replace(ALL_LISTINGS_SUFFIX, "")
                    .trim()
                    .to_string();
                record.user_id = user_link
                    .value()
                    .attr("href")
                    .and_then(|href| href.rsplit('/').next())
                    .unwrap_or_default()
                    .to_string();
            }
            record.location = contact
                .text()
                .map(str::trim)
                .find(|line| LOCATION_MARKERS.iter().any(|marker| line.contains(marker)))
                .unwrap_or_default()
                .to_string();
        }

        let phone_token = extract_phone_token(root, html);

        Ok(ExtractedListing {
            record,
            phone_token,
        })
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Text of the first match, or empty
fn select_text(scope: ElementRef<'_>, css: &str) -> String {
    select_first(scope, css).map(element_text).unwrap_or_default()
}

/// Trimmed text fragments of an element joined by single spaces
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first `<h1>`, else of `<title>`
///
/// A heading that exists but is empty yields an empty title.
fn extract_title(root: ElementRef<'_>) -> Option<String> {
    select_first(root, "h1")
        .or_else(|| select_first(root, "title"))
        .map(element_text)
}

/// Builds a readable title from the URL slug
fn title_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_end_matches(".html")
        .replace('-', " ")
}

fn extract_categories(content: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    content
        .select(&selector)
        .filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| CATEGORY_HREF.is_match(href))
        })
        .take(MAX_CATEGORIES)
        .map(element_text)
        .collect()
}

fn extract_date(content: ElementRef<'_>) -> String {
    let text = select_text(content, "span.viewsbb");
    match DATE_LABEL.captures(&text).and_then(|caps| caps.get(1)) {
        Some(date) => date.as_str().trim().to_string(),
        None => text,
    }
}

fn extract_phone_token(root: ElementRef<'_>, html: &str) -> Option<String> {
    select_first(root, "div#telshow")
        .and_then(|div| div.value().attr("data-h"))
        .map(str::to_string)
        .or_else(|| {
            PHONE_TOKEN
                .captures(html)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
}
