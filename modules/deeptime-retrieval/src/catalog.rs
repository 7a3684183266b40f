// Built-in provider catalog and the TOML catalog loader.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use deeptime_common::{
    DateParamShape, DateRange, Granularity, LinkRotRisk, ProviderDescriptor, ProviderKind,
    RateLimit,
};

use crate::registry::SourceRegistry;

pub const WAYBACK_CDX: &str = "wayback-cdx";
pub const CHRONICLING_AMERICA: &str = "chronicling-america";
pub const NYT_ARTICLE_SEARCH: &str = "nyt-article-search";
pub const GUARDIAN_CONTENT: &str = "guardian-content";
pub const GDELT_EVENTS: &str = "gdelt-events";
pub const SERPER_WEB: &str = "serper-web";
pub const BING_WEB: &str = "bing-web";

fn since(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[allow(clippy::too_many_arguments)]
fn descriptor(
    id: &str,
    kind: ProviderKind,
    label: &str,
    coverage: DateRange,
    granularity: Granularity,
    requires_auth: bool,
    rate_limit: RateLimit,
    link_rot_risk: LinkRotRisk,
    date_shape: DateParamShape,
) -> ProviderDescriptor {
    ProviderDescriptor {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        coverage,
        granularity,
        requires_auth,
        rate_limit,
        link_rot_risk,
        date_shape,
    }
}

/// Providers registered when no catalog file is given.
pub fn default_catalog() -> Vec<ProviderDescriptor> {
    vec![
        descriptor(
            WAYBACK_CDX,
            ProviderKind::WaybackCdx,
            "Internet Archive Wayback CDX",
            DateRange::new(since(1996, 1, 1), None),
            Granularity::MetadataOnly,
            false,
            RateLimit::per_second(2.0),
            LinkRotRisk::None,
            DateParamShape::Timestamp { width: 8 },
        ),
        descriptor(
            CHRONICLING_AMERICA,
            ProviderKind::ChroniclingAmerica,
            "Library of Congress Chronicling America",
            DateRange::new(since(1690, 1, 1), since(1963, 12, 31)),
            Granularity::FullText,
            false,
            RateLimit::per_second(2.0),
            LinkRotRisk::None,
            DateParamShape::UsDate,
        ),
        descriptor(
            NYT_ARTICLE_SEARCH,
            ProviderKind::NytArticleSearch,
            "New York Times Article Search",
            DateRange::new(since(1851, 9, 18), None),
            Granularity::Snippet,
            true,
            RateLimit::per_second(10.0).with_daily(4000),
            LinkRotRisk::Low,
            DateParamShape::CompactDate,
        ),
        descriptor(
            GUARDIAN_CONTENT,
            ProviderKind::GuardianContent,
            "The Guardian Open Platform",
            DateRange::new(since(1999, 1, 1), None),
            Granularity::FullText,
            true,
            RateLimit::per_second(12.0).with_daily(5000),
            LinkRotRisk::Low,
            DateParamShape::IsoDate,
        ),
        descriptor(
            GDELT_EVENTS,
            ProviderKind::GdeltEvents,
            "GDELT 1.0 events (BigQuery)",
            DateRange::new(since(1979, 1, 1), None),
            Granularity::MetadataOnly,
            true,
            RateLimit::per_second(1.0),
            LinkRotRisk::High,
            DateParamShape::Year,
        ),
        descriptor(
            SERPER_WEB,
            ProviderKind::SerperSearch,
            "Google web search (Serper)",
            DateRange::new(since(1996, 1, 1), None),
            Granularity::Snippet,
            true,
            RateLimit::per_second(5.0),
            LinkRotRisk::High,
            DateParamShape::LooseUsDate,
        ),
        descriptor(
            BING_WEB,
            ProviderKind::BingSearch,
            "Bing Web Search",
            DateRange::new(since(1996, 1, 1), None),
            Granularity::Snippet,
            true,
            RateLimit::per_second(3.0),
            LinkRotRisk::High,
            DateParamShape::IsoDate,
        ),
    ]
}

pub fn default_registry() -> deeptime_common::Result<SourceRegistry> {
    SourceRegistry::from_descriptors(default_catalog())
}

/// `[[source]]` tables, one per provider.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default, rename = "source")]
    sources: Vec<ProviderDescriptor>,
}

/// Parse a TOML catalog and register its sources in file order.
pub fn parse_catalog(content: &str) -> Result<SourceRegistry> {
    let file: CatalogFile = toml::from_str(content).context("Failed to parse source catalog")?;
    let registry = SourceRegistry::from_descriptors(file.sources)
        .context("Invalid source catalog")?;
    Ok(registry)
}

pub fn load_catalog(path: &Path) -> Result<SourceRegistry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source catalog: {}", path.display()))?;
    parse_catalog(&content).with_context(|| format!("Source catalog: {}", path.display()))
}
