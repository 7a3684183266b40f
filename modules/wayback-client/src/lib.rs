pub mod error;
pub mod types;

pub use error::{Result, WaybackError};
pub use types::{parse_cdx_rows, CdxCapture, CdxQuery, MatchType, Snapshot};

use std::time::Duration;

use types::AvailabilityResponse;

const CDX_URL: &str = "https://web.archive.org/cdx/search/cdx";
const AVAILABILITY_URL: &str = "https://archive.org/wayback/available";
const REPLAY_BASE: &str = "https://web.archive.org/web";

/// Replay address for a capture of `original_url` at `timestamp`.
/// The Wayback Machine redirects a partial timestamp to the nearest capture.
pub fn snapshot_url(original_url: &str, timestamp: &str) -> String {
    format!("{}/{}/{}", REPLAY_BASE, timestamp, with_scheme(original_url))
}

/// Calendar listing of every capture of `original_url`.
pub fn listing_url(original_url: &str) -> String {
    format!("{}/*/{}", REPLAY_BASE, with_scheme(original_url))
}

fn with_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// True when a capture timestamp falls on or before a (possibly shorter) target prefix.
fn at_or_before(capture: &str, target: &str) -> bool {
    let n = target.len().min(capture.len());
    match (capture.get(..n), target.get(..n)) {
        (Some(c), Some(t)) => c <= t,
        _ => false,
    }
}

pub struct WaybackClient {
    client: reqwest::Client,
    cdx_url: String,
    availability_url: String,
}

impl WaybackClient {
    pub fn new() -> Self {
        Self::with_endpoints(CDX_URL, AVAILABILITY_URL)
    }

    /// Point the client at alternate CDX / availability endpoints (mirrors, test servers).
    pub fn with_endpoints(cdx_url: &str, availability_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("deeptime/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            cdx_url: cdx_url.trim_end_matches('/').to_string(),
            availability_url: availability_url.to_string(),
        }
    }

    /// Query the CDX capture index.
    pub async fn captures(&self, query: &CdxQuery) -> Result<Vec<CdxCapture>> {
        tracing::debug!(url = %query.url, from = ?query.from, to = ?query.to, "CDX query");

        let resp = self
            .client
            .get(&self.cdx_url)
            .query(&query.to_params())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WaybackError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // The CDX server answers an empty body rather than `[]` when nothing matches.
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Vec<String>> = serde_json::from_str(&body)?;
        let captures = parse_cdx_rows(rows)?;
        tracing::debug!(url = %query.url, count = captures.len(), "CDX query complete");
        Ok(captures)
    }

    /// Ask the availability API for the capture closest to `timestamp`
    /// (either side). `None` when the archive holds no copy.
    pub async fn closest(&self, url: &str, timestamp: Option<&str>) -> Result<Option<Snapshot>> {
        let mut params = vec![("url", url.to_string())];
        if let Some(ts) = timestamp {
            params.push(("timestamp", ts.to_string()));
        }

        let resp = self
            .client
            .get(&self.availability_url)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WaybackError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: AvailabilityResponse = resp.json().await?;
        Ok(data
            .archived_snapshots
            .closest
            .filter(|c| c.available && !c.url.is_empty())
            .map(|c| Snapshot {
                url: c.url,
                timestamp: c.timestamp,
                status: c.status,
            }))
    }

    /// Nearest successful capture at or before `timestamp`.
    ///
    /// The availability API may answer with a later capture; in that case the
    /// CDX index is asked for the last 200 capture up to the target instead.
    pub async fn nearest_at_or_before(&self, url: &str, timestamp: &str) -> Result<Option<Snapshot>> {
        if let Some(snapshot) = self.closest(url, Some(timestamp)).await? {
            if at_or_before(&snapshot.timestamp, timestamp) {
                return Ok(Some(snapshot));
            }
            tracing::debug!(
                url,
                target = timestamp,
                closest = %snapshot.timestamp,
                "Closest capture is after target, falling back to CDX"
            );
        }

        let query = CdxQuery::new(url)
            .match_type(MatchType::Exact)
            .collapse(None)
            .range(None, Some(timestamp.to_string()))
            .limit(-1);
        Ok(self.captures(&query).await?.pop().map(capture_snapshot))
    }

    /// Most recent successful capture of `url`, regardless of date.
    pub async fn latest(&self, url: &str) -> Result<Option<Snapshot>> {
        let query = CdxQuery::new(url)
            .match_type(MatchType::Exact)
            .collapse(None)
            .limit(-1);
        Ok(self.captures(&query).await?.pop().map(capture_snapshot))
    }
}

impl Default for WaybackClient {
    fn default() -> Self {
        Self::new()
    }
}

fn capture_snapshot(capture: CdxCapture) -> Snapshot {
    Snapshot {
        url: snapshot_url(&capture.original, &capture.timestamp),
        timestamp: capture.timestamp,
        status: capture.statuscode,
    }
}
