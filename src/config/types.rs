use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The listings site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the site, e.g. `https://ustasi.az`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated listings endpoint
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Path of the AJAX endpoint that reveals phone numbers
    #[serde(rename = "phone-path", default = "default_phone_path")]
    pub phone_path: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Hard limit on listing pages visited during discovery
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum number of detail fetches in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_concurrency")]
    pub max_concurrent_requests: u32,

    /// Per-request and per-item timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Delay between consecutive listing pages (milliseconds)
    #[serde(rename = "page-delay", default = "default_page_delay")]
    pub page_delay: u64,

    /// Delay after each detail task before its slot is reused (milliseconds)
    #[serde(rename = "task-delay", default = "default_task_delay")]
    pub task_delay: u64,

    /// Consecutive pages without new URLs that end discovery
    #[serde(rename = "empty-page-threshold", default = "default_empty_page_threshold")]
    pub empty_page_threshold: u32,

    /// Completed items between progress flushes
    #[serde(rename = "flush-interval", default = "default_flush_interval")]
    pub flush_interval: u32,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay)
    }

    pub fn task_delay(&self) -> Duration {
        Duration::from_millis(self.task_delay)
    }
}

/// Headers sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Output file locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Crawl checkpoint used for resuming
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Records flushed periodically while scraping
    #[serde(rename = "intermediate-path", default = "default_intermediate_path")]
    pub intermediate_path: String,

    #[serde(rename = "json-path", default = "default_json_path")]
    pub json_path: String,

    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Written instead of the final outputs when a run is cut short
    #[serde(rename = "partial-json-path", default = "default_partial_json_path")]
    pub partial_json_path: String,

    #[serde(rename = "partial-csv-path", default = "default_partial_csv_path")]
    pub partial_csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            intermediate_path: default_intermediate_path(),
            json_path: default_json_path(),
            csv_path: default_csv_path(),
            partial_json_path: default_partial_json_path(),
            partial_csv_path: default_partial_csv_path(),
        }
    }
}

fn default_listing_path() -> String {
    "/homelist/".to_string()
}

fn default_phone_path() -> String {
    "/ajax.php".to_string()
}

fn default_concurrency() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_delay() -> u64 {
    200
}

fn default_task_delay() -> u64 {
    100
}

fn default_empty_page_threshold() -> u32 {
    10
}

fn default_flush_interval() -> u32 {
    50
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "en-GB,en-US;q=0.9,en;q=0.8,ru;q=0.7,az;q=0.6".to_string()
}

fn default_checkpoint_path() -> String {
    "./harvest_progress.json".to_string()
}

fn default_intermediate_path() -> String {
    "./listings_temp.json".to_string()
}

fn default_json_path() -> String {
    "./listings.json".to_string()
}

fn default_csv_path() -> String {
    "./listings.csv".to_string()
}

fn default_partial_json_path() -> String {
    "./listings_partial.json".to_string()
}

fn default_partial_csv_path() -> String {
    "./listings_partial.csv".to_string()
}
