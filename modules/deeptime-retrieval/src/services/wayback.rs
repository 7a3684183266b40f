use async_trait::async_trait;
use tracing::debug;

use deeptime_common::ProviderKind;
use wayback_client::{CdxQuery, MatchType, WaybackClient};

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

/// Capture-index listing for a domain over the planned window.
pub struct WaybackAdapter {
    client: WaybackClient,
    match_type: MatchType,
}

impl WaybackAdapter {
    pub fn new() -> Self {
        Self::with_client(WaybackClient::new())
    }

    pub fn with_client(client: WaybackClient) -> Self {
        Self {
            client,
            match_type: MatchType::Domain,
        }
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }
}

impl Default for WaybackAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for WaybackAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WaybackCdx
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        if params.text.is_empty() {
            debug!(provider = ctx.call.source_id(), "No URL or domain to look up, skipping");
            return Ok(RawResponse::WaybackCdx(Vec::new()));
        }

        let query = CdxQuery::new(params.text.clone())
            .match_type(self.match_type)
            .range(params.from.clone(), params.to.clone())
            .limit(ctx.max_results as i64);
        let captures = ctx
            .send(|| async { Ok(self.client.captures(&query).await?) })
            .await?;
        Ok(RawResponse::WaybackCdx(captures))
    }
}
