pub mod error;
pub mod types;

pub use error::{NytError, Result};
pub use types::{Article, ArticlePage, ArticleQuery, Headline, Sort, MAX_PAGE, PAGE_SIZE};

use std::time::Duration;

use types::ApiResponse;

const BASE_URL: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";

pub struct NytClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NytClient {
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

    /// Fetch one page of Article Search results.
    pub async fn search(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        tracing::debug!(text = %query.text, page = query.page, "NYT article search");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&query.to_params())
            .query(&[("api-key", &self.api_key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NytError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let data: ApiResponse = serde_json::from_str(&body)?;
        Ok(ArticlePage {
            articles: data.response.docs,
            total_hits: data.response.meta.hits,
            page: query.page,
        })
    }
}
