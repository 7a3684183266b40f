//! Archive fallback for result links.
//!
//! The resolver builds a lookup address for any URL without touching the
//! network, and asks the archive for a concrete capture only when given a
//! date or when the caller reports a failed live fetch. A missing capture or
//! an unreachable archive is a normal outcome: `archive_url` stays `None`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use deeptime_common::RateLimit;
use wayback_client::WaybackClient;

use crate::throttle::Throttle;

/// Where archived copies come from.
#[async_trait]
pub trait ArchiveLookup: Send + Sync {
    /// Replay URL of the newest capture at or before `timestamp` (`YYYYMMDD`).
    async fn at_or_before(&self, url: &str, timestamp: &str) -> Result<Option<String>>;

    /// Replay URL of the newest capture overall.
    async fn latest(&self, url: &str) -> Result<Option<String>>;
}

#[async_trait]
impl ArchiveLookup for WaybackClient {
    async fn at_or_before(&self, url: &str, timestamp: &str) -> Result<Option<String>> {
        Ok(self
            .nearest_at_or_before(url, timestamp)
            .await?
            .map(|snapshot| snapshot.url))
    }

    async fn latest(&self, url: &str) -> Result<Option<String>> {
        Ok(WaybackClient::latest(self, url)
            .await?
            .map(|snapshot| snapshot.url))
    }
}

/// Spaces lookups against an archive by its rate limit.
pub struct ThrottledArchive<A> {
    inner: A,
    throttle: Throttle,
}

impl<A: ArchiveLookup> ThrottledArchive<A> {
    pub fn new(inner: A, limit: &RateLimit) -> Self {
        Self {
            inner,
            throttle: Throttle::new(limit),
        }
    }
}

#[async_trait]
impl<A: ArchiveLookup> ArchiveLookup for ThrottledArchive<A> {
    async fn at_or_before(&self, url: &str, timestamp: &str) -> Result<Option<String>> {
        self.throttle.acquire().await?;
        self.inner.at_or_before(url, timestamp).await
    }

    async fn latest(&self, url: &str) -> Result<Option<String>> {
        self.throttle.acquire().await?;
        self.inner.latest(url).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    /// The input URL, unchanged.
    pub live_url: String,
    /// Archive address that redirects to the nearest capture (or lists all
    /// captures when no date is known). Built without any request.
    pub lookup_url: String,
    /// A capture confirmed to exist.
    pub archive_url: Option<String>,
}

pub struct LinkResolver {
    archive: Arc<dyn ArchiveLookup>,
}

impl LinkResolver {
    pub fn new(archive: Arc<dyn ArchiveLookup>) -> Self {
        Self { archive }
    }

    /// Wayback Machine lookups at two requests per second.
    pub fn wayback() -> Self {
        Self::new(Arc::new(ThrottledArchive::new(
            WaybackClient::new(),
            &RateLimit::per_second(2.0),
        )))
    }

    /// Deterministic archive address for `url`, no I/O.
    pub fn lookup_url(url: &str, date: Option<NaiveDate>) -> String {
        match date {
            Some(d) => wayback_client::snapshot_url(url, &d.format("%Y%m%d").to_string()),
            None => wayback_client::listing_url(url),
        }
    }

    /// Attach an archive fallback to `url`. With a date, the archive is asked
    /// for the nearest capture at or before it.
    pub async fn resolve(&self, url: &str, approximate_date: Option<NaiveDate>) -> ResolvedLink {
        let mut link = ResolvedLink {
            live_url: url.to_string(),
            lookup_url: Self::lookup_url(url, approximate_date),
            archive_url: None,
        };
        let Some(date) = approximate_date else {
            return link;
        };
        if !is_archivable(url) {
            debug!(url, "Not an archivable URL, skipping lookup");
            return link;
        }

        let timestamp = date.format("%Y%m%d").to_string();
        match self.archive.at_or_before(url, &timestamp).await {
            Ok(Some(archive_url)) => link.archive_url = Some(archive_url),
            Ok(None) => debug!(url, %timestamp, "No capture at or before date"),
            Err(e) => warn!(url, error = %e, "Archive lookup failed"),
        }
        link
    }

    /// Fallback after a live fetch of `url` failed: the most recent capture.
    /// Repeated calls give the same target unless the archive gains a capture.
    pub async fn resolve_on_demand(&self, url: &str) -> ResolvedLink {
        let mut link = ResolvedLink {
            live_url: url.to_string(),
            lookup_url: Self::lookup_url(url, None),
            archive_url: None,
        };
        if !is_archivable(url) {
            debug!(url, "Not an archivable URL, skipping lookup");
            return link;
        }

        match self.archive.latest(url).await {
            Ok(Some(archive_url)) => link.archive_url = Some(archive_url),
            Ok(None) => debug!(url, "No capture in archive"),
            Err(e) => warn!(url, error = %e, "Archive lookup failed"),
        }
        link
    }
}

/// HTTP(S) URL with a host, or a bare host-like string the archive can key on.
fn is_archivable(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return false;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    match Url::parse(&candidate) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}
