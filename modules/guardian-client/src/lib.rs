pub mod error;
pub mod types;

pub use error::{GuardianError, Result};
pub use types::{Content, ContentFields, ContentPage, ContentSearch, OrderBy, MAX_PAGE_SIZE};

use std::time::Duration;

use types::ApiResponse;

const BASE_URL: &str = "https://content.guardianapis.com/search";

pub struct GuardianClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GuardianClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.to_string(),
        }
    }

    /// Fetch one page of content search results.
    pub async fn search(&self, search: &ContentSearch) -> Result<ContentPage> {
        tracing::debug!(text = %search.text, page = search.page, "Guardian content search");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&search.to_params())
            .query(&[("api-key", &self.api_key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GuardianError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let data: ApiResponse = serde_json::from_str(&body)?;
        let response = data.response;

        // The API reports some failures with HTTP 200 and status "error".
        if response.status != "ok" {
            return Err(GuardianError::Api {
                status: status.as_u16(),
                message: response
                    .message
                    .unwrap_or_else(|| format!("response status '{}'", response.status)),
            });
        }

        Ok(ContentPage {
            results: response.results,
            total: response.total,
            current_page: response.current_page,
            pages: response.pages,
        })
    }
}
