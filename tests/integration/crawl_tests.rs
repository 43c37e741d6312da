//! Integration tests for the harvester
//!
//! Most tests drive the coordinator against an in-memory site so they can
//! count requests and stall fetches on demand. The last test runs the full
//! HTTP stack against a wiremock server.

use listing_harvester::config::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use listing_harvester::crawler::{Coordinator, FetchError, HtmlExtractor, PageFetcher};
use listing_harvester::output::FileOutputWriter;
use listing_harvester::storage::{
    CheckpointStage, CheckpointStore, CrawlCheckpoint, JsonCheckpointStore,
};
use listing_harvester::{CrawlPhase, ListingIdentifier, Record};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://ustasi.az";

/// In-memory listings site
///
/// Listing page `offset` links the paths in `pages[offset]`; later offsets
/// are empty. Detail pages for `broken` paths lack the content container and
/// `unreachable` paths answer 503.
#[derive(Default)]
struct FakeSite {
    pages: Vec<Vec<String>>,
    broken: HashSet<String>,
    unreachable: HashSet<String>,
    latency: Duration,
    /// Detail fetches after this many stall forever and fire `stalled`
    stall_after: Option<usize>,
    stalled: Arc<Notify>,
    listing_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSite {
    /// `count` listings spread over pages of `per_page`
    fn with_listings(count: usize, per_page: usize) -> Self {
        let paths: Vec<String> = (1..=count).map(|i| format!("/usta-{}.html", i)).collect();
        Self {
            pages: paths.chunks(per_page).map(<[String]>::to_vec).collect(),
            ..Self::default()
        }
    }

    fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

fn listing_html(paths: &[String]) -> String {
    let items: String = paths
        .iter()
        .map(|p| format!(r#"<div class="nobj prod"><a href="{}">item</a></div>"#, p))
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn detail_html(path: &str) -> String {
    format!(
        r#"<html><head><title>Ustasi.az</title></head><body>
        <h1>Usta {}</h1>
        <div id="openhalf">
            <a href="/temir">Təmir</a>
            <span class="pricecolor">40 AZN</span>
            <p class="infop100">Təcili sifarişlər qəbul olunur, qiymət razılaşma yolu ilə</p>
            <div class="infocontact"><a href="/user/7">Anar (Bütün Elanları)</a><br>Bakı şəhəri</div>
        </div>
        </body></html>"#,
        path
    )
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch_listing_page(&self, offset: u32) -> Result<String, FetchError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let paths = self
            .pages
            .get(offset as usize)
            .cloned()
            .unwrap_or_default();
        Ok(listing_html(&paths))
    }

    async fn fetch_detail_page(&self, url: &str) -> Result<String, FetchError> {
        let call = self.detail_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stall_after.is_some_and(|limit| call > limit) {
            self.stalled.notify_one();
            std::future::pending::<()>().await;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Uneven latency so completion order differs from discovery order
        let path = url.trim_start_matches(BASE).to_string();
        let jitter = (path.len() as u32 * 7) % 4;
        tokio::time::sleep(self.latency * jitter).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.contains(&path) {
            return Err(FetchError::Status(503));
        }
        if self.broken.contains(&path) {
            return Ok("<html><body><h1>Elan silinib</h1></body></html>".to_string());
        }
        Ok(detail_html(&path))
    }

    async fn fetch_phone(
        &self,
        _id: &ListingIdentifier,
        _token: &str,
    ) -> Result<String, FetchError> {
        Err(FetchError::Status(404))
    }
}

/// Creates a test configuration writing every file under `dir`
fn create_test_config(base_url: &str, dir: &Path, concurrency: u32) -> Config {
    let path = |name: &str| dir.join(name).display().to_string();
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            listing_path: "/homelist/".to_string(),
            phone_path: "/ajax.php".to_string(),
        },
        crawler: CrawlerConfig {
            max_pages: 50,
            max_concurrent_requests: concurrency,
            request_timeout: 30,
            page_delay: 0,
            task_delay: 0,
            empty_page_threshold: 10,
            flush_interval: 50,
        },
        http: HttpConfig::default(),
        output: OutputConfig {
            checkpoint_path: path("progress.json"),
            intermediate_path: path("listings_temp.json"),
            json_path: path("listings.json"),
            csv_path: path("listings.csv"),
            partial_json_path: path("listings_partial.json"),
            partial_csv_path: path("listings_partial.csv"),
        },
    }
}

fn checkpoint_store(dir: &TempDir) -> JsonCheckpointStore {
    JsonCheckpointStore::new(dir.path().join("progress.json"))
}

fn coordinator(dir: &TempDir, site: Arc<FakeSite>, concurrency: u32) -> Coordinator {
    let config = create_test_config(BASE, dir.path(), concurrency);
    let output = FileOutputWriter::new(&config.output);
    let extractor = HtmlExtractor::new(url::Url::parse(BASE).expect("valid base"));
    Coordinator::with_components(
        config,
        site,
        Arc::new(extractor),
        Box::new(checkpoint_store(dir)),
        Box::new(output),
        false,
    )
}

fn read_records(path: &Path) -> Vec<Record> {
    let content = std::fs::read_to_string(path).expect("output file exists");
    serde_json::from_str(&content).expect("output is a JSON record array")
}

fn urls(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{}/usta-{}.html", BASE, i))
        .collect()
}

#[tokio::test]
async fn test_full_run_writes_final_outputs() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(FakeSite::with_listings(25, 10));

    let summary = coordinator(&dir, Arc::clone(&site), 10)
        .run_until(std::future::pending())
        .await
        .expect("run succeeds");

    assert_eq!(summary.phase, CrawlPhase::Done);
    assert_eq!(summary.records, 25);
    // 3 pages with listings, then 10 empty ones
    assert_eq!(site.listing_calls(), 13);
    assert_eq!(site.detail_calls(), 25);

    let records = read_records(&dir.path().join("listings.json"));
    assert_eq!(records.len(), 25);
    assert_eq!(records[0].listing_id.as_str(), "1");
    assert_eq!(records[0].title, "Usta /usta-1.html");
    assert_eq!(records[0].user_name, "Anar");
    assert_eq!(records[0].location, "Bakı şəhəri");

    assert!(!dir.path().join("progress.json").exists());
    assert!(!dir.path().join("listings_temp.json").exists());
}

#[tokio::test]
async fn test_no_duplicate_identifiers_in_output() {
    let dir = TempDir::new().unwrap();
    // The same listing reachable under two slugs, and a repeated link
    let site = Arc::new(FakeSite {
        pages: vec![
            vec!["/santexnik-5.html".to_string(), "/kafel-6.html".to_string()],
            vec!["/elektrik-5.html".to_string(), "/kafel-6.html".to_string()],
        ],
        ..FakeSite::default()
    });

    coordinator(&dir, site, 10)
        .run_until(std::future::pending())
        .await
        .unwrap();

    let records = read_records(&dir.path().join("listings.json"));
    let ids: HashSet<_> = records.iter().map(|r| r.listing_id.clone()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(ids.len(), records.len());
}

#[tokio::test]
async fn test_resume_skips_discovery_and_processed_listings() {
    let dir = TempDir::new().unwrap();
    let processed: Vec<_> = (1..=8)
        .map(|i| ListingIdentifier::new(i.to_string()))
        .collect();
    checkpoint_store(&dir)
        .save(&CrawlCheckpoint::urls_collected(urls(20), processed))
        .unwrap();

    let site = Arc::new(FakeSite::with_listings(20, 10));
    let summary = coordinator(&dir, Arc::clone(&site), 10)
        .run_until(std::future::pending())
        .await
        .unwrap();

    assert!(summary.resumed);
    assert_eq!(site.listing_calls(), 0);
    assert_eq!(site.detail_calls(), 12);
    assert_eq!(summary.counters.skipped, 8);
    assert_eq!(summary.counters.succeeded, 12);
}

#[tokio::test]
async fn test_unchanged_site_gives_identical_csv() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();

    for dir in [&first_dir, &second_dir] {
        let site = Arc::new(FakeSite {
            latency: Duration::from_millis(3),
            ..FakeSite::with_listings(40, 10)
        });
        coordinator(dir, site, 10)
            .run_until(std::future::pending())
            .await
            .unwrap();
    }

    let first = std::fs::read(first_dir.path().join("listings.csv")).unwrap();
    let second = std::fs::read(second_dir.path().join("listings.csv")).unwrap();
    assert_eq!(first, second);

    let csv = String::from_utf8(first).unwrap();
    assert!(csv.starts_with(
        "listing_id,title,categories,price,phone,user_name,user_id,location,date,description,url\n"
    ));
    assert_eq!(csv.lines().count(), 41);
}

#[tokio::test]
async fn test_detail_fetches_never_exceed_ceiling() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(FakeSite {
        latency: Duration::from_millis(10),
        ..FakeSite::with_listings(60, 20)
    });

    coordinator(&dir, Arc::clone(&site), 10)
        .run_until(std::future::pending())
        .await
        .unwrap();

    let max = site.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 10, "saw {} concurrent detail fetches", max);
    assert_eq!(site.detail_calls(), 60);
}

#[tokio::test]
async fn test_interrupt_after_seven_of_twenty() {
    let dir = TempDir::new().unwrap();
    let stalled = Arc::new(Notify::new());
    let site = Arc::new(FakeSite {
        stall_after: Some(7),
        stalled: Arc::clone(&stalled),
        ..FakeSite::with_listings(20, 10)
    });

    let summary = coordinator(&dir, site, 1)
        .run_until(async move { stalled.notified().await })
        .await
        .unwrap();

    assert_eq!(summary.phase, CrawlPhase::Interrupted);
    assert_eq!(summary.records, 7);

    let partial = read_records(&dir.path().join("listings_partial.json"));
    assert_eq!(partial.len(), 7);
    assert!(dir.path().join("listings_partial.csv").exists());
    assert!(!dir.path().join("listings.json").exists());

    let checkpoint = checkpoint_store(&dir).load().expect("checkpoint kept");
    assert_eq!(checkpoint.stage, CheckpointStage::UrlsCollected);
    assert_eq!(checkpoint.scraped_ids.len(), 7);
    assert_eq!(checkpoint.urls.as_ref().map(Vec::len), Some(20));

    // The next run picks up the remaining 13 and keeps the first 7
    let site = Arc::new(FakeSite::with_listings(20, 10));
    let summary = coordinator(&dir, Arc::clone(&site), 10)
        .run_until(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.phase, CrawlPhase::Done);
    assert_eq!(site.listing_calls(), 0);
    assert_eq!(site.detail_calls(), 13);
    assert_eq!(read_records(&dir.path().join("listings.json")).len(), 20);
    assert!(checkpoint_store(&dir).load().is_none());
}

#[tokio::test]
async fn test_extraction_failure_is_final_but_fetch_failure_is_not() {
    let dir = TempDir::new().unwrap();
    let mut site = FakeSite::with_listings(6, 10);
    site.broken.insert("/usta-2.html".to_string());
    site.unreachable.insert("/usta-4.html".to_string());

    let mut coordinator = coordinator(&dir, Arc::new(site), 10);
    let summary = coordinator
        .run_until(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.counters.succeeded, 4);
    assert_eq!(summary.counters.failed, 2);

    let session = coordinator.session();
    assert!(session.is_processed(&ListingIdentifier::new("2")));
    assert!(!session.is_processed(&ListingIdentifier::new("4")));

    let records = read_records(&dir.path().join("listings.json"));
    let ids: Vec<_> = records.iter().map(|r| r.listing_id.to_string()).collect();
    assert_eq!(ids, ["1", "3", "5", "6"]);
}

#[tokio::test]
async fn test_full_http_cycle() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // First listing page links two items; every later page is empty
    Mock::given(method("POST"))
        .and(path("/homelist/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[
            "/santexnik-11.html".to_string(),
            "/elektrik-12.html".to_string(),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/homelist/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(10)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/santexnik-11.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>Santexnik</h1>
            <div id="openhalf">
                <span class="pricecolor">30 AZN</span>
                <div id="telshow" data-h="00112233445566778899aabbccddeeff"></div>
            </div></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    // Removed listing: fetched fine but holds no content container
    Mock::given(method("GET"))
        .and(path("/elektrik-12.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ajax.php"))
        .and(body_string_contains("id=11"))
        .and(body_string_contains("h=00112233445566778899aabbccddeeff"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"ok":1,"tel":"(050) 555-12-34"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), 4);

    let mut coordinator = Coordinator::new(config, true).expect("Failed to create coordinator");
    let summary = coordinator
        .run_until(std::future::pending())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.phase, CrawlPhase::Done);
    assert_eq!(summary.discovered, 2);

    let records = read_records(&dir.path().join("listings.json"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].listing_id.as_str(), "11");
    assert_eq!(records[0].title, "Santexnik");
    assert_eq!(records[0].price, "30 AZN");
    assert_eq!(records[0].phone, "(050) 555-12-34");
    assert_eq!(records[0].url, format!("{}/santexnik-11.html", base_url));
}
