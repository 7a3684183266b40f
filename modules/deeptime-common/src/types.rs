use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::dates::DateParamShape;
use crate::error::{DeeptimeError, Result};

// --- Capability enums ---

/// Richness of the content a provider returns. Ordered from poorest to richest,
/// so `FullText > Snippet > MetadataOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    MetadataOnly,
    Snippet,
    FullText,
}

impl Granularity {
    pub fn carries_text(self) -> bool {
        !matches!(self, Granularity::MetadataOnly)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::MetadataOnly => write!(f, "METADATA_ONLY"),
            Granularity::Snippet => write!(f, "SNIPPET"),
            Granularity::FullText => write!(f, "FULL_TEXT"),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = DeeptimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "METADATA_ONLY" | "METADATA" => Ok(Granularity::MetadataOnly),
            "SNIPPET" => Ok(Granularity::Snippet),
            "FULL_TEXT" | "FULLTEXT" => Ok(Granularity::FullText),
            other => Err(DeeptimeError::Config(format!("unknown granularity: {other}"))),
        }
    }
}

/// How likely links handed out by a provider are to die over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkRotRisk {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for LinkRotRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkRotRisk::None => write!(f, "NONE"),
            LinkRotRisk::Low => write!(f, "LOW"),
            LinkRotRisk::Medium => write!(f, "MEDIUM"),
            LinkRotRisk::High => write!(f, "HIGH"),
        }
    }
}

/// Closed set of upstream adapters. Each variant has exactly one request
/// adapter and one normalizer arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    WaybackCdx,
    ChroniclingAmerica,
    NytArticleSearch,
    GuardianContent,
    GdeltEvents,
    SerperSearch,
    BingSearch,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::WaybackCdx => write!(f, "wayback_cdx"),
            ProviderKind::ChroniclingAmerica => write!(f, "chronicling_america"),
            ProviderKind::NytArticleSearch => write!(f, "nyt_article_search"),
            ProviderKind::GuardianContent => write!(f, "guardian_content"),
            ProviderKind::GdeltEvents => write!(f, "gdelt_events"),
            ProviderKind::SerperSearch => write!(f, "serper_search"),
            ProviderKind::BingSearch => write!(f, "bing_search"),
        }
    }
}

// --- Dates ---

/// Inclusive calendar-date interval. `None` on either side means open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Overlap of two ranges, or `None` when they share no day at all.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let from = match (self.from, other.from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        };
        let to = match (self.to, other.to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
            (None, b) => b,
        };
        let overlap = DateRange { from, to };
        if overlap.is_inverted() {
            None
        } else {
            Some(overlap)
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.from {
            Some(d) => write!(f, "{d}")?,
            None => write!(f, "*")?,
        }
        write!(f, "..")?;
        match self.to {
            Some(d) => write!(f, "{d}"),
            None => write!(f, "*"),
        }
    }
}

// --- Rate limits ---

/// Request quota declared by a provider. Enforced by the provider adapters,
/// never by the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per second. `None` = unbounded.
    #[serde(default)]
    pub per_second: Option<f64>,
    /// Requests allowed per calendar day. `None` = unbounded.
    #[serde(default)]
    pub per_day: Option<u32>,
}

impl RateLimit {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn per_second(requests: f64) -> Self {
        Self {
            per_second: Some(requests),
            per_day: None,
        }
    }

    pub fn with_daily(mut self, requests: u32) -> Self {
        self.per_day = Some(requests);
        self
    }

    /// Minimum spacing between two consecutive requests.
    pub fn min_interval(&self) -> Option<Duration> {
        self.per_second
            .filter(|rps| *rps > 0.0)
            .map(|rps| Duration::from_secs_f64(1.0 / rps))
    }
}

// --- Provider descriptor ---

/// One upstream source in the registry. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderDescriptor {
    pub id: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub label: String,
    /// Known reliable coverage. `coverage.to == None` means "through today".
    pub coverage: DateRange,
    pub granularity: Granularity,
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub rate_limit: RateLimit,
    pub link_rot_risk: LinkRotRisk,
    pub date_shape: DateParamShape,
}

impl ProviderDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DeeptimeError::InvalidDescriptor {
                id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.coverage.is_inverted() {
            return Err(DeeptimeError::InvalidDescriptor {
                id: self.id.clone(),
                reason: format!("coverage {} ends before it starts", self.coverage),
            });
        }
        if let Err(reason) = self.date_shape.validate() {
            return Err(DeeptimeError::InvalidDescriptor {
                id: self.id.clone(),
                reason,
            });
        }
        if let Some(rps) = self.rate_limit.per_second {
            if rps.is_nan() || rps <= 0.0 {
                return Err(DeeptimeError::InvalidDescriptor {
                    id: self.id.clone(),
                    reason: "rate_limit.per_second must be > 0".into(),
                });
            }
        }
        Ok(())
    }
}

// --- Query ---

/// Caller input to the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct QueryRequest {
    /// Free text. May be empty for pure archive listings.
    #[builder(default, setter(into))]
    #[serde(default)]
    pub text: String,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// Minimum granularity to honor when choosing providers.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub granularity_preference: Option<Granularity>,
}

impl QueryRequest {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.date_from, self.date_to)
    }

    pub fn validate(&self) -> Result<()> {
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) if from > to => Err(DeeptimeError::InvalidRange { from, to }),
            _ => Ok(()),
        }
    }
}

// --- Result ---

/// Normalized item from any provider. Lives only for one query's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub source_id: String,
    /// Publication or capture date, coerced to a calendar date.
    pub timestamp: NaiveDate,
    pub title: Option<String>,
    /// Always present. Empty for METADATA_ONLY providers; `granularity` tells
    /// "no text available" apart from "provider returned empty text".
    pub body: String,
    pub granularity: Granularity,
    pub original_url: Option<String>,
    pub archive_url: Option<String>,
}

impl ResultRecord {
    pub fn with_archive_url(mut self, archive_url: Option<String>) -> Self {
        self.archive_url = archive_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn granularity_orders_full_text_highest() {
        assert!(Granularity::FullText > Granularity::Snippet);
        assert!(Granularity::Snippet > Granularity::MetadataOnly);
    }

    #[test]
    fn link_rot_orders_none_lowest() {
        assert!(LinkRotRisk::None < LinkRotRisk::Low);
        assert!(LinkRotRisk::Medium < LinkRotRisk::High);
    }

    #[test]
    fn intersect_partial_overlap() {
        let coverage = DateRange::new(Some(date(1851, 1, 1)), None);
        let request = DateRange::new(Some(date(1850, 1, 1)), Some(date(1860, 12, 31)));
        let overlap = coverage.intersect(&request).unwrap();
        assert_eq!(overlap.from, Some(date(1851, 1, 1)));
        assert_eq!(overlap.to, Some(date(1860, 12, 31)));
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let coverage = DateRange::new(Some(date(1979, 1, 1)), None);
        let request = DateRange::new(Some(date(1850, 1, 1)), Some(date(1860, 12, 31)));
        assert!(coverage.intersect(&request).is_none());
    }

    #[test]
    fn intersect_single_shared_day() {
        let a = DateRange::new(None, Some(date(2000, 1, 1)));
        let b = DateRange::new(Some(date(2000, 1, 1)), None);
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.from, overlap.to);
    }

    #[test]
    fn unbounded_intersect_keeps_other_side() {
        let request = DateRange::new(Some(date(2000, 1, 1)), Some(date(2005, 12, 31)));
        assert_eq!(DateRange::unbounded().intersect(&request), Some(request));
    }

    #[test]
    fn inverted_request_rejected() {
        let request = QueryRequest::builder()
            .date_from(date(2005, 1, 1))
            .date_to(date(2000, 1, 1))
            .build();
        assert_eq!(
            request.validate(),
            Err(DeeptimeError::InvalidRange {
                from: date(2005, 1, 1),
                to: date(2000, 1, 1),
            })
        );
    }

    #[test]
    fn open_ended_request_is_valid() {
        let request = QueryRequest::builder().text("x").date_from(date(2005, 1, 1)).build();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn rate_limit_interval() {
        assert_eq!(
            RateLimit::per_second(2.0).min_interval(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(RateLimit::unbounded().min_interval(), None);
    }

    #[test]
    fn descriptor_from_toml() {
        let raw = r#"
            id = "local-paper"
            kind = "chronicling_america"
            coverage = { from = "1900-01-01", to = "1922-12-31" }
            granularity = "FULL_TEXT"
            link_rot_risk = "LOW"
            date_shape = { kind = "us_date" }
            rate_limit = { per_second = 1.0, per_day = 1000 }
        "#;
        let descriptor: ProviderDescriptor = toml::from_str(raw).unwrap();
        assert_eq!(descriptor.kind, ProviderKind::ChroniclingAmerica);
        assert_eq!(descriptor.coverage.to, Some(date(1922, 12, 31)));
        assert_eq!(descriptor.rate_limit.per_day, Some(1000));
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn descriptor_with_inverted_coverage_is_invalid() {
        let descriptor = ProviderDescriptor {
            id: "bad".into(),
            kind: ProviderKind::GdeltEvents,
            label: String::new(),
            coverage: DateRange::new(Some(date(2000, 1, 1)), Some(date(1990, 1, 1))),
            granularity: Granularity::MetadataOnly,
            requires_auth: false,
            rate_limit: RateLimit::unbounded(),
            link_rot_risk: LinkRotRisk::High,
            date_shape: DateParamShape::Year,
        };
        assert!(matches!(
            descriptor.validate(),
            Err(DeeptimeError::InvalidDescriptor { .. })
        ));
    }
}
