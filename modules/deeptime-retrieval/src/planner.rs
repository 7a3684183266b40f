//! Query planning: which providers to ask, for which dates, in what shape.
//!
//! Planning is pure. It reads one registry snapshot and the request, touches
//! no network and keeps no state, so the same inputs always produce the same
//! plan.

use serde::Serialize;
use tracing::debug;

use deeptime_common::{DateRange, ProviderDescriptor, ProviderKind, QueryRequest, Result};

use crate::registry::{preference, SourceRegistry};

/// Request parameters already written in the provider's own date encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallParams {
    pub text: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedCall {
    pub descriptor: ProviderDescriptor,
    /// Requested range clipped to the provider's coverage.
    pub window: DateRange,
    pub params: CallParams,
}

impl PlannedCall {
    pub fn source_id(&self) -> &str {
        &self.descriptor.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub requested: DateRange,
    pub calls: Vec<PlannedCall>,
    /// The granularity preference would have excluded every provider, so it
    /// was dropped and lower-granularity providers are included.
    pub granularity_fallback: bool,
}

impl Plan {
    pub fn is_degraded(&self) -> bool {
        self.granularity_fallback
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.calls.iter().map(PlannedCall::source_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

pub fn plan(registry: &SourceRegistry, request: &QueryRequest) -> Result<Plan> {
    request.validate()?;
    let requested = request.range();

    let covering: Vec<(&ProviderDescriptor, DateRange)> = registry
        .list_covering_range(&requested)
        .into_iter()
        .filter_map(|d| d.coverage.intersect(&requested).map(|window| (d, window)))
        .collect();

    let mut granularity_fallback = false;
    let selected = match request.granularity_preference {
        Some(minimum) => {
            let preferred: Vec<_> = covering
                .iter()
                .filter(|(d, _)| d.granularity >= minimum)
                .cloned()
                .collect();
            if preferred.is_empty() && !covering.is_empty() {
                debug!(%minimum, "No provider meets granularity preference, keeping all");
                granularity_fallback = true;
                covering
            } else {
                preferred
            }
        }
        None => covering,
    };

    let mut calls: Vec<PlannedCall> = selected
        .into_iter()
        .map(|(descriptor, window)| PlannedCall {
            params: shape_params(descriptor, &request.text, &window),
            descriptor: descriptor.clone(),
            window,
        })
        .collect();
    calls.sort_by(|a, b| preference(&a.descriptor, &b.descriptor));

    debug!(
        range = %requested,
        sources = ?calls.iter().map(PlannedCall::source_id).collect::<Vec<_>>(),
        granularity_fallback,
        "Query planned"
    );

    Ok(Plan {
        requested,
        calls,
        granularity_fallback,
    })
}

fn shape_params(descriptor: &ProviderDescriptor, text: &str, window: &DateRange) -> CallParams {
    let shape = descriptor.date_shape;
    CallParams {
        text: shape_text(descriptor.kind, text),
        from: window.from.map(|d| shape.format_start(d)),
        to: window.to.map(|d| shape.format_end(d)),
    }
}

/// The capture index matches on URL keys, so free text becomes a bare
/// lowercase domain-like string.
fn shape_text(kind: ProviderKind, text: &str) -> String {
    match kind {
        ProviderKind::WaybackCdx => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect(),
        _ => text.trim().to_string(),
    }
}
