// Google web search via Serper. Date restriction uses the `tbs` custom date
// range operator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deeptime_common::ProviderKind;

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

const SEARCH_URL: &str = "https://google.serper.dev/search";
const PAGE_SIZE: usize = 10;
const MAX_PAGE: u32 = 10;

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    /// Display date, e.g. "Sep 12, 2001". Often missing.
    pub date: Option<String>,
}

pub struct SerperAdapter {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl SerperAdapter {
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
        tbs: Option<&str>,
        page: u32,
    ) -> Result<Vec<OrganicResult>, ProviderFailure> {
        let mut body = serde_json::json!({
            "q": query,
            "num": PAGE_SIZE,
            "page": page,
        });
        if let Some(tbs) = tbs {
            body["tbs"] = serde_json::Value::String(tbs.to_string());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
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

/// `cdr:1,cd_min:M/D/YYYY,cd_max:M/D/YYYY`, with either bound optional.
pub fn date_restriction(from: Option<&str>, to: Option<&str>) -> Option<String> {
    if from.is_none() && to.is_none() {
        return None;
    }
    let mut tbs = String::from("cdr:1");
    if let Some(from) = from {
        tbs.push_str(&format!(",cd_min:{from}"));
    }
    if let Some(to) = to {
        tbs.push_str(&format!(",cd_max:{to}"));
    }
    Some(tbs)
}

pub fn parse_response(body: &str) -> Result<Vec<OrganicResult>, ProviderFailure> {
    let data: SerperResponse = serde_json::from_str(body)?;
    Ok(data.organic)
}

#[async_trait]
impl ProviderAdapter for SerperAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SerperSearch
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        let tbs = date_restriction(params.from.as_deref(), params.to.as_deref());

        let mut results = Vec::new();
        let mut page = 1;
        while results.len() < ctx.max_results && page <= MAX_PAGE {
            let batch = ctx
                .send(|| self.search_page(&params.text, tbs.as_deref(), page))
                .await?;
            let full = batch.len() >= PAGE_SIZE;
            results.extend(batch);
            if !full {
                break;
            }
            page += 1;
        }
        results.truncate(ctx.max_results);
        debug!(query = %params.text, count = results.len(), "Serper search complete");
        Ok(RawResponse::SerperSearch(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restriction_with_both_bounds() {
        assert_eq!(
            date_restriction(Some("1/1/2001"), Some("12/31/2001")).as_deref(),
            Some("cdr:1,cd_min:1/1/2001,cd_max:12/31/2001")
        );
    }

    #[test]
    fn restriction_with_open_end() {
        assert_eq!(
            date_restriction(Some("1/1/2001"), None).as_deref(),
            Some("cdr:1,cd_min:1/1/2001")
        );
        assert_eq!(date_restriction(None, None), None);
    }

    #[test]
    fn parses_organic_results() {
        let results = parse_response(
            r#"{
                "searchParameters": {"q": "dot-com crash", "type": "search"},
                "organic": [
                    {"title": "Dot-com bubble", "link": "https://example.com/bubble",
                     "snippet": "The bubble burst in 2000.", "date": "Mar 10, 2000", "position": 1},
                    {"title": "No date", "link": "https://example.com/other", "snippet": "..."}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].date.as_deref(), Some("Mar 10, 2000"));
        assert!(results[1].date.is_none());
    }

    #[test]
    fn non_json_is_schema_drift() {
        assert!(matches!(
            parse_response("<html>oops</html>"),
            Err(ProviderFailure::SchemaDrift(_))
        ));
    }
}
