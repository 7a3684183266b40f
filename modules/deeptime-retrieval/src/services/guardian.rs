use async_trait::async_trait;

use deeptime_common::ProviderKind;
use guardian_client::{ContentSearch, GuardianClient, MAX_PAGE_SIZE};

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

pub struct GuardianAdapter {
    client: GuardianClient,
}

impl GuardianAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: GuardianClient::new(api_key.to_string()),
        }
    }

    pub fn with_client(client: GuardianClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for GuardianAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GuardianContent
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        let body_text = ctx.call.descriptor.granularity.carries_text();
        let base = ContentSearch::new(params.text.clone())
            .dates(params.from.clone(), params.to.clone())
            .body_text(body_text)
            .page_size(MAX_PAGE_SIZE);

        let mut results = Vec::new();
        let mut page = 1;
        while results.len() < ctx.max_results {
            // Page size stays fixed so page N always starts at item (N - 1) * size.
            let search = base.clone().page(page);
            let result = ctx
                .send(|| async { Ok(self.client.search(&search).await?) })
                .await?;
            let more = result.has_more();
            results.extend(result.results);
            if !more {
                break;
            }
            page += 1;
        }
        results.truncate(ctx.max_results);
        Ok(RawResponse::GuardianContent(results))
    }
}
