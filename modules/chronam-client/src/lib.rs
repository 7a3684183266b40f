pub mod error;
pub mod types;

pub use error::{ChronamError, Result};
pub use types::{PageMatch, PageSearch, SearchPage};

use std::time::Duration;

const BASE_URL: &str = "https://chroniclingamerica.loc.gov/search/pages/results/";

pub struct ChronamClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChronamClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Fetch one page of OCR search results.
    pub async fn search(&self, search: &PageSearch) -> Result<SearchPage> {
        tracing::debug!(text = %search.text, page = search.page, "Chronicling America search");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&search.to_params())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChronamError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let page: SearchPage = serde_json::from_str(&body)?;
        Ok(page)
    }
}

impl Default for ChronamClient {
    fn default() -> Self {
        Self::new()
    }
}
