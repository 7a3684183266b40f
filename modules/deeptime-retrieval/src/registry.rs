use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{error, info};

use deeptime_common::{DateRange, DeeptimeError, ProviderDescriptor, Result};

/// Preference order: lowest link-rot risk first, then richest granularity,
/// then id so the order is total.
pub fn preference(a: &ProviderDescriptor, b: &ProviderDescriptor) -> Ordering {
    a.link_rot_risk
        .cmp(&b.link_rot_risk)
        .then_with(|| b.granularity.cmp(&a.granularity))
        .then_with(|| a.id.cmp(&b.id))
}

/// Catalog of upstream providers. Built once, then shared read-only behind
/// a [`RegistryHandle`].
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<ProviderDescriptor>,
    by_id: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every descriptor in order, stopping at the first invalid or duplicate one.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ProviderDescriptor>) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.by_id.contains_key(&descriptor.id) {
            return Err(DeeptimeError::DuplicateSource(descriptor.id));
        }
        self.by_id.insert(descriptor.id.clone(), self.sources.len());
        self.sources.push(descriptor);
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Result<&ProviderDescriptor> {
        self.by_id
            .get(id)
            .map(|&i| &self.sources[i])
            .ok_or_else(|| DeeptimeError::UnknownSource(id.to_string()))
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> &[ProviderDescriptor] {
        &self.sources
    }

    /// Descriptors whose coverage shares at least one day with `range`,
    /// in preference order.
    pub fn list_covering_range(&self, range: &DateRange) -> Vec<&ProviderDescriptor> {
        let mut covering: Vec<&ProviderDescriptor> = self
            .sources
            .iter()
            .filter(|d| d.coverage.intersect(range).is_some())
            .collect();
        covering.sort_by(|a, b| preference(a, b));
        covering
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Process-wide registry with atomic snapshot replacement.
///
/// Each query takes one `Arc` snapshot and plans against it; a reload swaps
/// in a fully built registry and never touches the one in use.
pub struct RegistryHandle {
    inner: ArcSwap<SourceRegistry>,
    reloading: AtomicBool,
}

impl RegistryHandle {
    pub fn new(initial: SourceRegistry) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(initial)),
            reloading: AtomicBool::new(false),
        }
    }

    pub fn load_full(&self) -> Arc<SourceRegistry> {
        self.inner.load_full()
    }

    pub fn replace(&self, registry: SourceRegistry) {
        info!(sources = registry.len(), "Source registry replaced");
        self.inner.store(Arc::new(registry));
    }

    /// Re-read a TOML catalog and swap it in. On failure the current
    /// registry stays in place. Only one reload runs at a time.
    pub fn reload_from(&self, path: &Path) -> anyhow::Result<()> {
        if self
            .reloading
            .compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
            .is_err()
        {
            info!("Registry reload already in progress, skipping");
            return Ok(());
        }

        let result = crate::catalog::load_catalog(path);
        self.reloading.store(false, AtomicOrdering::SeqCst);

        match result {
            Ok(registry) => {
                self.replace(registry);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "Registry reload failed, keeping current catalog");
                Err(e)
            }
        }
    }
}
