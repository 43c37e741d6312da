//! HTTP fetcher implementation
//!
//! This module handles every request the harvester makes:
//! - Listing pages (POST with the page offset)
//! - Detail pages (GET)
//! - The phone-number reveal AJAX call (POST form, JSON reply)
//!
//! Each call is bounded by the configured timeout and classified into a
//! `FetchError`. Nothing here retries; that decision belongs to the caller.

use crate::config::Config;
use crate::url::ListingIdentifier;
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Failure of a single network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but did not have the expected shape
    #[error("unexpected response: {0}")]
    Payload(String),
}

/// Network boundary of the crawler
///
/// The crawl engine only talks to the site through this trait, which keeps
/// discovery and the scrape pool testable with in-memory fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the listing page at `offset`
    async fn fetch_listing_page(&self, offset: u32) -> Result<String, FetchError>;

    /// Fetches an item's detail page
    async fn fetch_detail_page(&self, url: &str) -> Result<String, FetchError>;

    /// Reveals an item's phone number using the token found on its detail page
    async fn fetch_phone(&self, id: &ListingIdentifier, token: &str)
        -> Result<String, FetchError>;
}

/// Builds an HTTP client carrying the site's fixed headers
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::load_config;
/// use listing_harvester::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("harvester.toml")).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, HarvestError> {
    let base = Url::parse(&config.site.base_url)?;
    let origin = base.origin().ascii_serialization();
    let referer = format!("{}/", origin);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, header_value(&config.http.accept_language)?);
    headers.insert(ORIGIN, header_value(&origin)?);
    headers.insert(REFERER, header_value(&referer)?);
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    Client::builder()
        .user_agent(config.http.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.crawler.request_timeout())
        .connect_timeout(config.crawler.request_timeout())
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(HarvestError::HttpClient)
}

fn header_value(value: &str) -> Result<HeaderValue, HarvestError> {
    HeaderValue::from_str(value).map_err(|e| {
        ConfigError::Validation(format!("invalid header value '{}': {}", value, e)).into()
    })
}

/// Reply of the phone reveal endpoint
#[derive(Debug, Deserialize)]
struct PhoneReveal {
    #[serde(default)]
    ok: serde_json::Value,
    #[serde(default)]
    tel: Option<String>,
}

impl PhoneReveal {
    fn is_ok(&self) -> bool {
        self.ok.as_i64() == Some(1) || self.ok.as_str() == Some("1")
    }
}

/// `PageFetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    listing_url: Url,
    phone_url: Url,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &Config) -> Result<Self, HarvestError> {
        let base = Url::parse(&config.site.base_url)?;
        Ok(Self {
            client,
            listing_url: base.join(&config.site.listing_path)?,
            phone_url: base.join(&config.site.phone_path)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_listing_page(&self, offset: u32) -> Result<String, FetchError> {
        let start = offset.to_string();
        let response = self
            .client
            .post(self.listing_url.clone())
            .query(&[("start", start.as_str())])
            .form(&[("start", start.as_str())])
            .send()
            .await
            .map_err(classify_error)?;

        read_body(response).await
    }

    async fn fetch_detail_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;
        read_body(response).await
    }

    async fn fetch_phone(
        &self,
        id: &ListingIdentifier,
        token: &str,
    ) -> Result<String, FetchError> {
        let response = self
            .client
            .post(self.phone_url.clone())
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .form(&[
                ("act", "telshow"),
                ("id", id.as_str()),
                ("t", "product"),
                ("h", token),
                ("rf", ""),
            ])
            .send()
            .await
            .map_err(classify_error)?;

        let body = read_body(response).await?;
        let reveal: PhoneReveal = serde_json::from_str(&body)
            .map_err(|e| FetchError::Payload(format!("phone reply is not JSON: {}", e)))?;

        if !reveal.is_ok() {
            return Err(FetchError::Payload(format!(
                "phone reveal refused for listing {}",
                id
            )));
        }

        Ok(reveal.tel.unwrap_or_default())
    }
}

/// Maps a non-2xx status to `FetchError::Status`, otherwise reads the body
async fn read_body(response: Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    response.text().await.map_err(classify_error)
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(error.to_string())
    }
}
