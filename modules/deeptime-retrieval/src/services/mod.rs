// Provider adapters. Each adapter turns a planned call into requests against
// one upstream API and hands back that API's raw items. Pagination lives here
// so every page goes through the provider's throttle.

pub mod bing;
pub mod chronam;
pub mod gdelt;
pub mod guardian;
pub mod nyt;
pub mod serper;
pub mod wayback;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use deeptime_common::{AppConfig, ProviderKind};

use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;
use crate::planner::PlannedCall;
use crate::throttle::{RetryPolicy, Throttle};

pub use bing::BingAdapter;
pub use chronam::ChronamAdapter;
pub use gdelt::GdeltAdapter;
pub use guardian::GuardianAdapter;
pub use nyt::NytAdapter;
pub use serper::SerperAdapter;
pub use wayback::WaybackAdapter;

/// Everything an adapter needs for one planned call.
pub struct CallContext<'a> {
    pub call: &'a PlannedCall,
    /// Stop paginating once this many items are collected.
    pub max_results: usize,
    pub throttle: &'a Throttle,
    pub retry: RetryPolicy,
}

impl CallContext<'_> {
    /// Issue one upstream request: wait for a throttle slot, retry transient failures.
    pub async fn send<T, F, Fut>(&self, op: F) -> Result<T, ProviderFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderFailure>>,
    {
        self.retry
            .run(self.throttle, self.call.source_id(), op)
            .await
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure>;
}

/// Adapters for every provider whose credentials are present.
pub fn adapters_from_config(config: &AppConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(WaybackAdapter::new()),
        Arc::new(ChronamAdapter::new()),
    ];
    if let Some(ref key) = config.nyt_api_key {
        adapters.push(Arc::new(NytAdapter::new(key)));
    }
    if let Some(ref key) = config.guardian_api_key {
        adapters.push(Arc::new(GuardianAdapter::new(key)));
    }
    if let (Some(project), Some(token)) = (&config.gdelt_bq_project, &config.gdelt_bq_token) {
        adapters.push(Arc::new(GdeltAdapter::new(project, token)));
    }
    if let Some(ref key) = config.serper_api_key {
        adapters.push(Arc::new(SerperAdapter::new(key)));
    }
    if let Some(ref key) = config.bing_api_key {
        adapters.push(Arc::new(BingAdapter::new(key)));
    }
    adapters
}
