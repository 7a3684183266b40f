//! Maps each provider's raw items onto [`ResultRecord`].
//!
//! Shared rules, whatever the provider:
//! - `timestamp` is coerced to a calendar date; an item without a usable
//!   date is dropped and counted, never fatal for the batch.
//! - `body` is empty for METADATA_ONLY providers. The record's `granularity`
//!   tells that apart from a provider that returned empty text.
//! - A response whose shape does not belong to the descriptor's provider
//!   yields no records and an anomaly note.

use chrono::NaiveDate;
use tracing::debug;

use chronam_client::PageMatch;
use deeptime_common::{coerce_calendar_date, ProviderDescriptor, ProviderKind, ResultRecord};
use gdelt_client::EventRecord;
use guardian_client::Content;
use nyt_client::Article;
use wayback_client::CdxCapture;

use crate::services::bing::WebPage;
use crate::services::serper::OrganicResult;

/// Items exactly as one provider returned them.
#[derive(Debug, Clone)]
pub enum RawResponse {
    WaybackCdx(Vec<CdxCapture>),
    ChroniclingAmerica(Vec<PageMatch>),
    NytArticleSearch(Vec<Article>),
    GuardianContent(Vec<Content>),
    GdeltEvents(Vec<EventRecord>),
    SerperSearch(Vec<OrganicResult>),
    BingSearch(Vec<WebPage>),
}

impl RawResponse {
    pub fn kind(&self) -> ProviderKind {
        match self {
            RawResponse::WaybackCdx(_) => ProviderKind::WaybackCdx,
            RawResponse::ChroniclingAmerica(_) => ProviderKind::ChroniclingAmerica,
            RawResponse::NytArticleSearch(_) => ProviderKind::NytArticleSearch,
            RawResponse::GuardianContent(_) => ProviderKind::GuardianContent,
            RawResponse::GdeltEvents(_) => ProviderKind::GdeltEvents,
            RawResponse::SerperSearch(_) => ProviderKind::SerperSearch,
            RawResponse::BingSearch(_) => ProviderKind::BingSearch,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawResponse::WaybackCdx(v) => v.len(),
            RawResponse::ChroniclingAmerica(v) => v.len(),
            RawResponse::NytArticleSearch(v) => v.len(),
            RawResponse::GuardianContent(v) => v.len(),
            RawResponse::GdeltEvents(v) => v.len(),
            RawResponse::SerperSearch(v) => v.len(),
            RawResponse::BingSearch(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub records: Vec<ResultRecord>,
    /// Items skipped for lacking a usable date.
    pub dropped: usize,
    /// Set when the response did not have the provider's expected shape.
    pub anomaly: Option<String>,
}

/// Provider-neutral view of one raw item before the shared rules apply.
struct Item {
    date: Option<String>,
    title: Option<String>,
    text: Option<String>,
    url: Option<String>,
    archive_url: Option<String>,
}

pub fn normalize(descriptor: &ProviderDescriptor, raw: RawResponse) -> NormalizedBatch {
    if raw.kind() != descriptor.kind {
        let anomaly = format!(
            "{} response received for {} provider {}",
            raw.kind(),
            descriptor.kind,
            descriptor.id
        );
        debug!(provider = %descriptor.id, %anomaly, "Discarding mismatched response");
        return NormalizedBatch {
            anomaly: Some(anomaly),
            ..Default::default()
        };
    }

    let items: Vec<Item> = match raw {
        RawResponse::WaybackCdx(captures) => captures.into_iter().map(from_capture).collect(),
        RawResponse::ChroniclingAmerica(pages) => pages.into_iter().map(from_page).collect(),
        RawResponse::NytArticleSearch(articles) => {
            articles.into_iter().map(from_article).collect()
        }
        RawResponse::GuardianContent(content) => content.into_iter().map(from_content).collect(),
        RawResponse::GdeltEvents(events) => events.into_iter().map(from_event).collect(),
        RawResponse::SerperSearch(results) => results.into_iter().map(from_organic).collect(),
        RawResponse::BingSearch(pages) => pages.into_iter().map(from_web_page).collect(),
    };

    let mut batch = NormalizedBatch::default();
    for item in items {
        match to_record(descriptor, item) {
            Some(record) => batch.records.push(record),
            None => batch.dropped += 1,
        }
    }
    if batch.dropped > 0 {
        debug!(provider = %descriptor.id, dropped = batch.dropped, "Dropped items without a usable date");
    }
    batch
}

fn to_record(descriptor: &ProviderDescriptor, item: Item) -> Option<ResultRecord> {
    let timestamp: NaiveDate = item.date.as_deref().and_then(coerce_calendar_date)?;
    let body = if descriptor.granularity.carries_text() {
        item.text.map(|t| t.trim().to_string()).unwrap_or_default()
    } else {
        String::new()
    };
    Some(ResultRecord {
        source_id: descriptor.id.clone(),
        timestamp,
        title: non_empty(item.title),
        body,
        granularity: descriptor.granularity,
        original_url: non_empty(item.url),
        archive_url: item.archive_url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// --- Per-provider field mapping ---

fn from_capture(capture: CdxCapture) -> Item {
    // A capture is its own archived copy.
    let archive_url = (!capture.original.is_empty() && !capture.timestamp.is_empty())
        .then(|| wayback_client::snapshot_url(&capture.original, &capture.timestamp));
    Item {
        date: Some(capture.timestamp),
        title: None,
        text: None,
        url: Some(capture.original),
        archive_url,
    }
}

fn from_page(page: PageMatch) -> Item {
    let url = page.page_url();
    Item {
        date: page.date,
        title: page.title,
        text: page.ocr_eng,
        url,
        archive_url: None,
    }
}

fn from_article(article: Article) -> Item {
    let text = Some(article.excerpt());
    Item {
        date: article.pub_date,
        title: article.headline.main,
        text,
        url: article.web_url,
        archive_url: None,
    }
}

fn from_content(content: Content) -> Item {
    Item {
        date: content.web_publication_date,
        title: content.web_title,
        text: content.fields.body_text,
        url: content.web_url,
        archive_url: None,
    }
}

fn from_event(event: EventRecord) -> Item {
    let title = event.label();
    Item {
        date: event.sql_date,
        title,
        text: None,
        url: event.source_url,
        archive_url: None,
    }
}

fn from_organic(result: OrganicResult) -> Item {
    Item {
        date: result.date,
        title: Some(result.title),
        text: Some(result.snippet),
        url: Some(result.link),
        archive_url: None,
    }
}

fn from_web_page(page: WebPage) -> Item {
    // Crawl date stands in when Bing has no publication date.
    Item {
        date: page.date_published.or(page.date_last_crawled),
        title: Some(page.name),
        text: Some(page.snippet),
        url: Some(page.url),
        archive_url: None,
    }
}
