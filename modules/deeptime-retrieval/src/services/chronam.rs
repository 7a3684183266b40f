use async_trait::async_trait;

use chronam_client::{ChronamClient, PageSearch};
use deeptime_common::ProviderKind;

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

/// Fixed on every page: the API offsets results by `(page - 1) * rows`.
const MAX_ROWS: u32 = 50;

/// Digitized newspaper pages, paged until the cap or the last result.
pub struct ChronamAdapter {
    client: ChronamClient,
    state: Option<String>,
    language: Option<String>,
}

impl ChronamAdapter {
    pub fn new() -> Self {
        Self::with_client(ChronamClient::new())
    }

    pub fn with_client(client: ChronamClient) -> Self {
        Self {
            client,
            state: None,
            language: Some("eng".to_string()),
        }
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(String::from);
        self
    }

    fn search(&self, ctx: &CallContext<'_>, page: u32) -> PageSearch {
        let params = &ctx.call.params;
        let mut search = PageSearch::new(params.text.clone())
            .dates(params.from.clone(), params.to.clone())
            .language(self.language.as_deref())
            .rows(MAX_ROWS)
            .page(page);
        if let Some(ref state) = self.state {
            search = search.state(state.clone());
        }
        search
    }
}

impl Default for ChronamAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for ChronamAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChroniclingAmerica
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let mut pages = Vec::new();
        let mut page = 1;
        while pages.len() < ctx.max_results {
            let search = self.search(ctx, page);
            let result = ctx
                .send(|| async { Ok(self.client.search(&search).await?) })
                .await?;
            let more = result.has_more();
            pages.extend(result.items);
            if !more {
                break;
            }
            page += 1;
        }
        pages.truncate(ctx.max_results);
        Ok(RawResponse::ChroniclingAmerica(pages))
    }
}
