pub mod error;
pub mod types;

pub use error::{GdeltError, Result};
pub use types::{parse_rows, EventQuery, EventRecord, QueryResponse};

use std::time::Duration;

const BIGQUERY_URL: &str = "https://bigquery.googleapis.com/bigquery/v2/projects";

/// Server-side wait for the query job before BigQuery returns `jobComplete: false`.
const QUERY_TIMEOUT_MS: u64 = 20_000;

/// Runs GDELT event queries through the BigQuery `jobs.query` endpoint.
pub struct GdeltClient {
    client: reqwest::Client,
    project: String,
    token: String,
    base_url: String,
}

impl GdeltClient {
    /// `project` is the billing project; `token` an OAuth2 access token with BigQuery scope.
    pub fn new(project: String, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            project,
            token,
            base_url: BIGQUERY_URL.to_string(),
        }
    }

    pub async fn query_events(&self, query: &EventQuery) -> Result<Vec<EventRecord>> {
        tracing::debug!(
            from_year = query.from_year,
            to_year = query.to_year,
            limit = query.limit,
            "GDELT events query"
        );

        let url = format!("{}/{}/queries", self.base_url, self.project);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&query.to_request(QUERY_TIMEOUT_MS))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GdeltError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let data: QueryResponse = serde_json::from_str(&body)?;
        if !data.job_complete {
            return Err(GdeltError::Incomplete);
        }
        parse_rows(&data)
    }
}
