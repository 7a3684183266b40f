// Bing Web Search v7. Date restriction uses a `freshness` date range, which
// needs both ends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deeptime_common::ProviderKind;

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

const SEARCH_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
const MAX_COUNT: usize = 50;
/// Earliest date Bing accepts in a freshness range.
const EARLIEST: &str = "1996-01-01";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPages {
    #[serde(default)]
    total_estimated_matches: u64,
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub snippet: String,
    pub date_published: Option<String>,
    pub date_last_crawled: Option<String>,
}

/// One page of web results plus Bing's estimate of the total.
#[derive(Debug, Default)]
pub struct WebResults {
    pub pages: Vec<WebPage>,
    pub total_estimated: u64,
}

pub struct BingAdapter {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl BingAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, SEARCH_URL)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn search_page(
        &self,
        query: &str,
        freshness: Option<&str>,
        count: usize,
        offset: usize,
    ) -> Result<WebResults, ProviderFailure> {
        let mut params = vec![
            ("q", query.to_string()),
            ("count", count.to_string()),
            ("offset", offset.to_string()),
            ("responseFilter", "Webpages".to_string()),
        ];
        if let Some(freshness) = freshness {
            params.push(("freshness", freshness.to_string()));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderFailure::from_status(status.as_u16(), message));
        }
        parse_response(&resp.text().await?)
    }
}

/// `YYYY-MM-DD..YYYY-MM-DD`. A missing end is filled in, since Bing only
/// accepts closed ranges.
pub fn freshness(from: Option<&str>, to: Option<&str>) -> Option<String> {
    match (from, to) {
        (None, None) => None,
        (from, to) => {
            let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
            Some(format!(
                "{}..{}",
                from.unwrap_or(EARLIEST),
                to.map(String::from).unwrap_or(today)
            ))
        }
    }
}

pub fn parse_response(body: &str) -> Result<WebResults, ProviderFailure> {
    let data: BingResponse = serde_json::from_str(body)?;
    Ok(data
        .web_pages
        .map(|w| WebResults {
            pages: w.value,
            total_estimated: w.total_estimated_matches,
        })
        .unwrap_or_default())
}

#[async_trait]
impl ProviderAdapter for BingAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BingSearch
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        let freshness = freshness(params.from.as_deref(), params.to.as_deref());

        let mut pages = Vec::new();
        let mut offset = 0;
        while pages.len() < ctx.max_results {
            let count = (ctx.max_results - pages.len()).min(MAX_COUNT);
            let batch = ctx
                .send(|| self.search_page(&params.text, freshness.as_deref(), count, offset))
                .await?;
            let received = batch.pages.len();
            pages.extend(batch.pages);
            offset += received;
            if received < count || offset as u64 >= batch.total_estimated {
                break;
            }
        }
        pages.truncate(ctx.max_results);
        debug!(query = %params.text, count = pages.len(), "Bing search complete");
        Ok(RawResponse::BingSearch(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_with_both_bounds() {
        assert_eq!(
            freshness(Some("2001-09-01"), Some("2001-09-30")).as_deref(),
            Some("2001-09-01..2001-09-30")
        );
    }

    #[test]
    fn freshness_fills_missing_start() {
        assert_eq!(
            freshness(None, Some("2001-09-30")).as_deref(),
            Some("1996-01-01..2001-09-30")
        );
        assert_eq!(freshness(None, None), None);
    }

    #[test]
    fn parses_web_pages() {
        let results = parse_response(
            r#"{
                "_type": "SearchResponse",
                "webPages": {
                    "totalEstimatedMatches": 1200,
                    "value": [{
                        "name": "Y2K bug",
                        "url": "https://example.com/y2k",
                        "snippet": "Fears about the millennium bug...",
                        "dateLastCrawled": "2024-05-01T10:00:00.0000000Z"
                    }]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(results.total_estimated, 1200);
        assert_eq!(results.pages[0].name, "Y2K bug");
        assert!(results.pages[0].date_published.is_none());
    }

    #[test]
    fn missing_web_pages_means_no_results() {
        let results = parse_response(r#"{"_type": "SearchResponse"}"#).unwrap();
        assert!(results.pages.is_empty());
    }
}
