//! Fixture implementations for testing without network access.
//!
//! - `FixtureAdapter`: canned raw response, failure, or stall for one provider kind
//! - `FixtureArchive`: in-memory capture list behind [`ArchiveLookup`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use deeptime_common::ProviderKind;

use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;
use crate::resolver::ArchiveLookup;
use crate::services::{CallContext, ProviderAdapter};

// --- FixtureAdapter ---

enum Behavior {
    Respond(RawResponse),
    Fail(ProviderFailure),
    Stall(Duration),
}

pub struct FixtureAdapter {
    kind: ProviderKind,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FixtureAdapter {
    pub fn respond(response: RawResponse) -> Self {
        Self {
            kind: response.kind(),
            behavior: Behavior::Respond(response),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(kind: ProviderKind, failure: ProviderFailure) -> Self {
        Self {
            kind,
            behavior: Behavior::Fail(failure),
            calls: AtomicUsize::new(0),
        }
    }

    /// Never answers within `delay`; used to trip the per-provider timeout.
    pub fn stalled(kind: ProviderKind, delay: Duration) -> Self {
        Self {
            kind,
            behavior: Behavior::Stall(delay),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer as `kind` with a response of some other shape.
    pub fn mislabeled(kind: ProviderKind, response: RawResponse) -> Self {
        Self {
            kind,
            behavior: Behavior::Respond(response),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for FixtureAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch(&self, _ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Respond(response) => Ok(response.clone()),
            Behavior::Fail(failure) => Err(failure.clone()),
            Behavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(RawResponse::WaybackCdx(Vec::new()))
            }
        }
    }
}

// --- FixtureArchive ---

/// Captures keyed by URL, each a 14-digit timestamp.
pub struct FixtureArchive {
    captures: HashMap<String, Vec<String>>,
    unreachable: bool,
    lookups: AtomicUsize,
}

impl FixtureArchive {
    pub fn new() -> Self {
        Self {
            captures: HashMap::new(),
            unreachable: false,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Every lookup fails as if the archive were down.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    pub fn capture(mut self, url: &str, timestamp: &str) -> Self {
        let list = self.captures.entry(url.to_string()).or_default();
        list.push(timestamp.to_string());
        list.sort();
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            bail!("archive unreachable");
        }
        Ok(())
    }
}

impl Default for FixtureArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveLookup for FixtureArchive {
    async fn at_or_before(&self, url: &str, timestamp: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.captures.get(url).and_then(|list| {
            list.iter()
                .filter(|ts| ts.get(..timestamp.len()).is_some_and(|p| p <= timestamp))
                .next_back()
                .map(|ts| wayback_client::snapshot_url(url, ts))
        }))
    }

    async fn latest(&self, url: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self
            .captures
            .get(url)
            .and_then(|list| list.last())
            .map(|ts| wayback_client::snapshot_url(url, ts)))
    }
}
