//! Paging tests: each HTTP adapter against a local server holding a fixed,
//! numbered result set.
//!
//! Each test: serve N unique items the way the provider pages them → point
//! the adapter at the server → search → assert the records are unique, stop
//! at the cap or the end of the data, and took the expected request count.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use chronam_client::ChronamClient;
use deeptime_common::*;
use deeptime_retrieval::catalog::{
    self, BING_WEB, CHRONICLING_AMERICA, GUARDIAN_CONTENT, NYT_ARTICLE_SEARCH, SERPER_WEB,
};
use deeptime_retrieval::fixtures::FixtureArchive;
use deeptime_retrieval::services::bing::BingAdapter;
use deeptime_retrieval::services::chronam::ChronamAdapter;
use deeptime_retrieval::services::guardian::GuardianAdapter;
use deeptime_retrieval::services::nyt::NytAdapter;
use deeptime_retrieval::services::serper::SerperAdapter;
use deeptime_retrieval::*;
use guardian_client::GuardianClient;
use nyt_client::NytClient;

// ---------------------------------------------------------------------------
// Local API server
// ---------------------------------------------------------------------------

type Responder = Arc<dyn Fn(&Url, &[u8]) -> Value + Send + Sync>;

struct MockApi {
    base_url: String,
    requests: Arc<AtomicUsize>,
}

impl MockApi {
    async fn start(respond: impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/search", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));
        let respond: Responder = Arc::new(respond);

        let counter = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let respond = respond.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = answer(stream, respond, counter).await;
                });
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn answer(
    mut stream: TcpStream,
    respond: Responder,
    counter: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://127.0.0.1{target}")).unwrap();
    counter.fetch_add(1, Ordering::SeqCst);

    let body = respond(&url, &buf[head_end..]).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn param(url: &Url, name: &str) -> Option<usize> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .and_then(|(_, v)| v.parse().ok())
}

/// Item numbers `[start, start + size)` clipped to `total`.
fn window(start: usize, size: usize, total: usize) -> std::ops::Range<usize> {
    start.min(total)..(start + size).min(total)
}

// ---------------------------------------------------------------------------
// Provider page shapes
// ---------------------------------------------------------------------------

fn chronam_api(total: usize) -> impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static {
    move |url: &Url, _: &[u8]| {
        let rows = param(url, "rows").unwrap_or(20);
        let page = param(url, "page").unwrap_or(1);
        let items = window((page - 1) * rows, rows, total);
        let end_index = items.end;
        let items: Vec<Value> = items
            .map(|i| {
                json!({
                    "id": format!("/lccn/sn83030272/1900-01-01/ed-1/seq-{i}/"),
                    "title": "The sun.",
                    "date": "19000101",
                    "ocr_eng": format!("page {i} text"),
                })
            })
            .collect();
        json!({ "totalItems": total, "endIndex": end_index, "items": items })
    }
}

fn guardian_api(total: usize) -> impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static {
    move |url: &Url, _: &[u8]| {
        let size = param(url, "page-size").unwrap_or(10);
        let page = param(url, "page").unwrap_or(1);
        let results: Vec<Value> = window((page - 1) * size, size, total)
            .map(|i| {
                json!({
                    "id": format!("business/2001/mar/01/item-{i}"),
                    "webUrl": format!("https://www.theguardian.com/business/2001/mar/01/item-{i}"),
                    "webTitle": format!("Item {i}"),
                    "webPublicationDate": "2001-03-01T10:00:00Z",
                })
            })
            .collect();
        json!({
            "response": {
                "status": "ok",
                "total": total,
                "currentPage": page,
                "pages": total.div_ceil(size),
                "results": results,
            }
        })
    }
}

fn nyt_api(total: usize) -> impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static {
    move |url: &Url, _: &[u8]| {
        let page = param(url, "page").unwrap_or(0);
        let docs: Vec<Value> = window(page * 10, 10, total)
            .map(|i| {
                json!({
                    "web_url": format!("https://www.nytimes.com/2001/03/01/business/item-{i}.html"),
                    "headline": { "main": format!("Item {i}") },
                    "abstract": "Markets fell.",
                    "pub_date": "2001-03-01T05:00:00+0000",
                })
            })
            .collect();
        json!({ "status": "OK", "response": { "docs": docs, "meta": { "hits": total } } })
    }
}

fn bing_api(total: usize) -> impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static {
    move |url: &Url, _: &[u8]| {
        let count = param(url, "count").unwrap_or(10);
        let offset = param(url, "offset").unwrap_or(0);
        let value: Vec<Value> = window(offset, count, total)
            .map(|i| {
                json!({
                    "url": format!("https://example.com/bing/{i}"),
                    "name": format!("Item {i}"),
                    "snippet": "Markets fell.",
                    "datePublished": "2001-03-01",
                })
            })
            .collect();
        json!({ "webPages": { "totalEstimatedMatches": total, "value": value } })
    }
}

fn serper_api(total: usize) -> impl Fn(&Url, &[u8]) -> Value + Send + Sync + 'static {
    move |_: &Url, body: &[u8]| {
        let request: Value = serde_json::from_slice(body).unwrap_or_default();
        let page = request["page"].as_u64().unwrap_or(1) as usize;
        let num = request["num"].as_u64().unwrap_or(10) as usize;
        let organic: Vec<Value> = window((page - 1) * num, num, total)
            .map(|i| {
                json!({
                    "link": format!("https://example.com/serper/{i}"),
                    "title": format!("Item {i}"),
                    "snippet": "Markets fell.",
                    "date": "Mar 1, 2001",
                })
            })
            .collect();
        json!({ "organic": organic })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn retriever(max_results: usize) -> Retriever {
    let descriptors = catalog::default_catalog().into_iter().map(|mut d| {
        d.rate_limit = RateLimit::unbounded();
        d
    });
    let registry = Arc::new(RegistryHandle::new(
        SourceRegistry::from_descriptors(descriptors).unwrap(),
    ));
    let options = RetrieverOptions::builder()
        .max_results_per_provider(max_results)
        .archive_links(ArchiveLinkMode::Off)
        .retry(RetryPolicy::none())
        .build();
    Retriever::new(registry, LinkResolver::new(Arc::new(FixtureArchive::new())), options)
}

fn request(year: i32) -> QueryRequest {
    QueryRequest::builder()
        .text("stock market")
        .date_from(date(year, 1, 1))
        .date_to(date(year, 12, 31))
        .build()
}

/// Records from `source_id`, after checking the provider succeeded and no
/// URL came back twice.
fn unique_urls(outcome: &SearchOutcome, source_id: &str) -> HashSet<String> {
    let report = outcome.report(source_id).unwrap();
    assert_eq!(report.status, ProviderStatus::Ok, "{source_id}: {:?}", report.status);

    let urls: Vec<String> = outcome
        .records
        .iter()
        .filter(|r| r.source_id == source_id)
        .filter_map(|r| r.original_url.clone())
        .collect();
    assert_eq!(report.count, urls.len());
    let unique: HashSet<String> = urls.iter().cloned().collect();
    assert_eq!(unique.len(), urls.len(), "{source_id} returned duplicates");
    unique
}

// ---------------------------------------------------------------------------
// Cap lands inside a page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chronam_pages_are_unique_up_to_cap() {
    let api = MockApi::start(chronam_api(200)).await;
    let adapter = ChronamAdapter::with_client(ChronamClient::with_base_url(&api.base_url));
    let retriever = retriever(75).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(1900)).await.unwrap();

    assert_eq!(unique_urls(&outcome, CHRONICLING_AMERICA).len(), 75);
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn guardian_pages_are_unique_up_to_cap() {
    let api = MockApi::start(guardian_api(200)).await;
    let client = GuardianClient::with_base_url("test-key".to_string(), &api.base_url);
    let retriever = retriever(75).with_adapter(Arc::new(GuardianAdapter::with_client(client)));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, GUARDIAN_CONTENT).len(), 75);
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn nyt_pages_are_unique_up_to_cap() {
    let api = MockApi::start(nyt_api(200)).await;
    let client = NytClient::with_base_url("test-key".to_string(), &api.base_url);
    let retriever = retriever(75).with_adapter(Arc::new(NytAdapter::with_client(client)));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, NYT_ARTICLE_SEARCH).len(), 75);
    assert_eq!(api.requests(), 8);
}

#[tokio::test]
async fn bing_offsets_are_unique_up_to_cap() {
    let api = MockApi::start(bing_api(200)).await;
    let adapter = BingAdapter::with_endpoint("test-key", &api.base_url);
    let retriever = retriever(75).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, BING_WEB).len(), 75);
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn serper_pages_are_unique_up_to_cap() {
    let api = MockApi::start(serper_api(200)).await;
    let adapter = SerperAdapter::with_endpoint("test-key", &api.base_url);
    let retriever = retriever(75).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, SERPER_WEB).len(), 75);
    assert_eq!(api.requests(), 8);
}

// ---------------------------------------------------------------------------
// Data runs out before the cap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chronam_stops_at_last_result() {
    let api = MockApi::start(chronam_api(60)).await;
    let adapter = ChronamAdapter::with_client(ChronamClient::with_base_url(&api.base_url));
    let retriever = retriever(500).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(1900)).await.unwrap();

    assert_eq!(unique_urls(&outcome, CHRONICLING_AMERICA).len(), 60);
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn guardian_stops_at_last_page() {
    let api = MockApi::start(guardian_api(60)).await;
    let client = GuardianClient::with_base_url("test-key".to_string(), &api.base_url);
    let retriever = retriever(500).with_adapter(Arc::new(GuardianAdapter::with_client(client)));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, GUARDIAN_CONTENT).len(), 60);
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn nyt_stops_at_total_hits() {
    let api = MockApi::start(nyt_api(25)).await;
    let client = NytClient::with_base_url("test-key".to_string(), &api.base_url);
    let retriever = retriever(500).with_adapter(Arc::new(NytAdapter::with_client(client)));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, NYT_ARTICLE_SEARCH).len(), 25);
    assert_eq!(api.requests(), 3);
}

#[tokio::test]
async fn bing_stops_on_short_batch() {
    let api = MockApi::start(bing_api(30)).await;
    let adapter = BingAdapter::with_endpoint("test-key", &api.base_url);
    let retriever = retriever(500).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, BING_WEB).len(), 30);
    assert_eq!(api.requests(), 1);
}

#[tokio::test]
async fn serper_stops_at_page_limit() {
    let api = MockApi::start(serper_api(500)).await;
    let adapter = SerperAdapter::with_endpoint("test-key", &api.base_url);
    let retriever = retriever(200).with_adapter(Arc::new(adapter));

    let outcome = retriever.search(&request(2001)).await.unwrap();

    assert_eq!(unique_urls(&outcome, SERPER_WEB).len(), 100);
    assert_eq!(api.requests(), 10);
}
