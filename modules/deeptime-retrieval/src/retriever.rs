//! Retrieval entry point: plan, fan out to providers, normalize, attach
//! archive links.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use deeptime_common::{
    AppConfig, ArchiveLinkMode, LinkRotRisk, ProviderDescriptor, ProviderKind, QueryRequest,
    RateLimit, Result, ResultRecord,
};

use crate::error::ProviderStatus;
use crate::normalizer::{normalize, NormalizedBatch};
use crate::planner::{self, Plan, PlannedCall};
use crate::registry::RegistryHandle;
use crate::resolver::LinkResolver;
use crate::services::{adapters_from_config, CallContext, ProviderAdapter};
use crate::throttle::{RetryPolicy, Throttle};

#[derive(Debug, Clone, TypedBuilder)]
pub struct RetrieverOptions {
    #[builder(default = Duration::from_secs(20))]
    pub provider_timeout: Duration,
    #[builder(default = 100)]
    pub max_results_per_provider: usize,
    #[builder(default = ArchiveLinkMode::Risky)]
    pub archive_links: ArchiveLinkMode,
    #[builder(default = 8)]
    pub resolve_concurrency: usize,
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&AppConfig> for RetrieverOptions {
    fn from(config: &AppConfig) -> Self {
        Self::builder()
            .provider_timeout(config.provider_timeout)
            .max_results_per_provider(config.max_results_per_provider)
            .archive_links(config.archive_links)
            .resolve_concurrency(config.resolve_concurrency)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderReport {
    pub source_id: String,
    pub kind: ProviderKind,
    #[serde(flatten)]
    pub status: ProviderStatus,
    pub count: usize,
    pub dropped: usize,
    pub elapsed_ms: u64,
}

/// Partial results are normal: check `reports` for providers that failed.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query_id: Uuid,
    pub plan: Plan,
    pub records: Vec<ResultRecord>,
    pub reports: Vec<ProviderReport>,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        self.plan.is_degraded()
    }

    pub fn report(&self, source_id: &str) -> Option<&ProviderReport> {
        self.reports.iter().find(|r| r.source_id == source_id)
    }
}

pub struct Retriever {
    registry: Arc<RegistryHandle>,
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    resolver: LinkResolver,
    options: RetrieverOptions,
    throttles: Mutex<HashMap<String, (RateLimit, Arc<Throttle>)>>,
}

impl Retriever {
    pub fn new(registry: Arc<RegistryHandle>, resolver: LinkResolver, options: RetrieverOptions) -> Self {
        Self {
            registry,
            adapters: HashMap::new(),
            resolver,
            options,
            throttles: Mutex::new(HashMap::new()),
        }
    }

    /// Live adapters for every configured provider, Wayback for link fallback.
    pub fn from_config(config: &AppConfig, registry: Arc<RegistryHandle>) -> Self {
        Self::new(registry, LinkResolver::wayback(), RetrieverOptions::from(config))
            .with_adapters(adapters_from_config(config))
    }

    /// Register an adapter. A later adapter for the same kind replaces the earlier one.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn with_adapters(self, adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>) -> Self {
        adapters.into_iter().fold(self, Self::with_adapter)
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn options(&self) -> &RetrieverOptions {
        &self.options
    }

    pub fn plan(&self, request: &QueryRequest) -> Result<Plan> {
        planner::plan(&self.registry.load_full(), request)
    }

    /// Run a query end to end. Only an invalid request is an error; provider
    /// failures come back as per-provider reports.
    pub async fn search(&self, request: &QueryRequest) -> Result<SearchOutcome> {
        let query_id = Uuid::new_v4();
        let span = info_span!("query", %query_id);

        async move {
            let plan = self.plan(request)?;
            info!(
                text = %request.text,
                range = %plan.requested,
                sources = plan.calls.len(),
                degraded = plan.is_degraded(),
                "Query planned"
            );

            let results = join_all(plan.calls.iter().map(|call| self.run_call(call))).await;

            let mut records = Vec::new();
            let mut reports = Vec::with_capacity(results.len());
            for (report, batch) in results {
                reports.push(report);
                records.extend(batch.records);
            }

            self.attach_archive_links(&plan, &mut records).await;

            let failed = reports.iter().filter(|r| !r.status.is_ok()).count();
            info!(records = records.len(), failed, "Query complete");

            Ok(SearchOutcome {
                query_id,
                plan,
                records,
                reports,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_call(&self, call: &PlannedCall) -> (ProviderReport, NormalizedBatch) {
        let descriptor = &call.descriptor;
        let started = Instant::now();

        let (status, batch) = match self.adapters.get(&descriptor.kind) {
            None => (
                ProviderStatus::Unavailable(format!("no {} adapter configured", descriptor.kind)),
                NormalizedBatch::default(),
            ),
            Some(adapter) => {
                let throttle = self.throttle_for(descriptor);
                let ctx = CallContext {
                    call,
                    max_results: self.options.max_results_per_provider,
                    throttle: &throttle,
                    retry: self.options.retry,
                };
                let fetched = tokio::time::timeout(self.options.provider_timeout, adapter.fetch(&ctx))
                    .instrument(info_span!("provider", provider = %descriptor.id))
                    .await;
                match fetched {
                    Err(_) => (ProviderStatus::TimedOut, NormalizedBatch::default()),
                    Ok(Err(failure)) => (ProviderStatus::from(failure), NormalizedBatch::default()),
                    Ok(Ok(raw)) => {
                        let batch = normalize(descriptor, raw);
                        match batch.anomaly {
                            Some(ref anomaly) => (
                                ProviderStatus::SchemaDrift(anomaly.clone()),
                                NormalizedBatch::default(),
                            ),
                            None => (ProviderStatus::Ok, batch),
                        }
                    }
                }
            }
        };

        let report = ProviderReport {
            source_id: descriptor.id.clone(),
            kind: descriptor.kind,
            status,
            count: batch.records.len(),
            dropped: batch.dropped,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        if report.status.is_ok() {
            info!(
                provider = %report.source_id,
                count = report.count,
                dropped = report.dropped,
                elapsed_ms = report.elapsed_ms,
                "Provider finished"
            );
        } else {
            warn!(
                provider = %report.source_id,
                status = ?report.status,
                elapsed_ms = report.elapsed_ms,
                "Provider returned no results"
            );
        }
        (report, batch)
    }

    /// One throttle per source id, rebuilt if a reload changed its rate limit.
    fn throttle_for(&self, descriptor: &ProviderDescriptor) -> Arc<Throttle> {
        let mut throttles = self.throttles.lock().unwrap_or_else(|e| e.into_inner());
        match throttles.get(&descriptor.id) {
            Some((limit, throttle)) if *limit == descriptor.rate_limit => Arc::clone(throttle),
            _ => {
                let throttle = Arc::new(Throttle::new(&descriptor.rate_limit));
                throttles.insert(
                    descriptor.id.clone(),
                    (descriptor.rate_limit, Arc::clone(&throttle)),
                );
                throttle
            }
        }
    }

    async fn attach_archive_links(&self, plan: &Plan, records: &mut [ResultRecord]) {
        let risk: HashMap<&str, LinkRotRisk> = plan
            .calls
            .iter()
            .map(|c| (c.descriptor.id.as_str(), c.descriptor.link_rot_risk))
            .collect();

        let targets: Vec<_> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.archive_url.is_none())
            .filter(|(_, r)| {
                risk.get(r.source_id.as_str())
                    .is_some_and(|risk| self.options.archive_links.applies_to(*risk))
            })
            .filter_map(|(i, r)| r.original_url.clone().map(|url| (i, url, r.timestamp)))
            .collect();
        if targets.is_empty() {
            return;
        }

        let resolved: Vec<_> = stream::iter(targets)
            .map(|(i, url, date)| async move { (i, self.resolver.resolve(&url, Some(date)).await) })
            .buffer_unordered(self.options.resolve_concurrency.max(1))
            .collect()
            .await;

        let found = resolved.iter().filter(|(_, l)| l.archive_url.is_some()).count();
        info!(looked_up = resolved.len(), found, "Archive links attached");
        for (i, link) in resolved {
            records[i].archive_url = link.archive_url;
        }
    }
}
