use async_trait::async_trait;

use deeptime_common::ProviderKind;
use nyt_client::{ArticleQuery, NytClient, Sort};

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

pub struct NytAdapter {
    client: NytClient,
}

impl NytAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: NytClient::new(api_key.to_string()),
        }
    }

    pub fn with_client(client: NytClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for NytAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NytArticleSearch
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        let base = ArticleQuery::new(params.text.clone())
            .dates(params.from.clone(), params.to.clone())
            .sort(Sort::Relevance);

        let mut articles = Vec::new();
        let mut page = 0;
        while articles.len() < ctx.max_results {
            let query = base.clone().page(page);
            let result = ctx
                .send(|| async { Ok(self.client.search(&query).await?) })
                .await?;
            let more = result.has_more();
            articles.extend(result.articles);
            if !more {
                break;
            }
            page += 1;
        }
        articles.truncate(ctx.max_results);
        Ok(RawResponse::NytArticleSearch(articles))
    }
}
