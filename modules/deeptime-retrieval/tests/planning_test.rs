//! Planning tests: QueryRequest → Plan against hand-built and default registries.
//!
//! Pure: no adapters, no network, no clock.

use chrono::NaiveDate;
use deeptime_common::*;
use deeptime_retrieval::{catalog, plan, SourceRegistry};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn source(id: &str, kind: ProviderKind, from: NaiveDate, granularity: Granularity) -> ProviderDescriptor {
    ProviderDescriptor {
        id: id.into(),
        kind,
        label: String::new(),
        coverage: DateRange::new(Some(from), None),
        granularity,
        requires_auth: false,
        rate_limit: RateLimit::unbounded(),
        link_rot_risk: LinkRotRisk::Low,
        date_shape: DateParamShape::CompactDate,
    }
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

#[test]
fn inverted_range_fails_before_selection() {
    // An empty registry would plan nothing, so an Ok here would mean the
    // range check was skipped.
    let registry = SourceRegistry::new();
    let request = QueryRequest::builder()
        .date_from(date(2012, 1, 1))
        .date_to(date(1990, 1, 1))
        .build();

    let err = plan(&registry, &request).unwrap_err();
    assert!(matches!(err, DeeptimeError::InvalidRange { .. }));
}

#[test]
fn single_day_range_is_valid() {
    let registry = catalog::default_registry().unwrap();
    let request = QueryRequest::builder()
        .text("example.com")
        .date_from(date(2001, 9, 11))
        .date_to(date(2001, 9, 11))
        .build();
    let plan = plan(&registry, &request).unwrap();
    let cdx = &plan.calls[0];
    assert_eq!(cdx.source_id(), catalog::WAYBACK_CDX);
    assert_eq!(cdx.params.from.as_deref(), Some("20010911"));
    assert_eq!(cdx.params.to.as_deref(), Some("20010911"));
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[test]
fn zero_overlap_sources_never_planned() {
    let registry = catalog::default_registry().unwrap();
    let ranges = [
        (date(1700, 1, 1), date(1800, 12, 31)),
        (date(1964, 1, 1), date(1978, 12, 31)),
        (date(1990, 1, 1), date(2012, 12, 31)),
    ];
    for (from, to) in ranges {
        let request = QueryRequest::builder()
            .text("harbor")
            .date_from(from)
            .date_to(to)
            .build();
        let requested = request.range();
        let plan = plan(&registry, &request).unwrap();
        for call in &plan.calls {
            assert!(
                call.descriptor.coverage.intersect(&requested).is_some(),
                "{} planned for {requested}",
                call.source_id()
            );
        }
        for descriptor in registry.list() {
            if descriptor.coverage.intersect(&requested).is_none() {
                assert!(!plan.source_ids().contains(&descriptor.id.as_str()));
            }
        }
    }
}

#[test]
fn only_the_1851_source_covers_the_1850s() {
    let registry = SourceRegistry::from_descriptors([
        source("events", ProviderKind::GdeltEvents, date(1979, 1, 1), Granularity::MetadataOnly),
        source("articles", ProviderKind::NytArticleSearch, date(1851, 9, 18), Granularity::Snippet),
    ])
    .unwrap();
    let request = QueryRequest::builder()
        .text("railroad")
        .date_from(date(1850, 1, 1))
        .date_to(date(1860, 12, 31))
        .build();

    let plan = plan(&registry, &request).unwrap();

    assert_eq!(plan.source_ids(), vec!["articles"]);
    let call = &plan.calls[0];
    assert_eq!(call.window.from, Some(date(1851, 9, 18)));
    assert_eq!(call.params.from.as_deref(), Some("18510918"));
    assert_eq!(call.params.to.as_deref(), Some("18601231"));
}

#[test]
fn web_archive_range_is_shaped_as_timestamps() {
    let registry = catalog::default_registry().unwrap();
    let request = QueryRequest::builder()
        .text("example.com")
        .date_from(date(2000, 1, 1))
        .date_to(date(2005, 12, 31))
        .build();

    let plan = plan(&registry, &request).unwrap();

    let cdx = plan
        .calls
        .iter()
        .find(|c| c.source_id() == catalog::WAYBACK_CDX)
        .expect("capture index planned");
    assert_eq!(cdx.params.text, "example.com");
    assert_eq!(cdx.params.from.as_deref(), Some("20000101"));
    assert_eq!(cdx.params.to.as_deref(), Some("20051231"));
}

// ---------------------------------------------------------------------------
// Ordering and determinism
// ---------------------------------------------------------------------------

#[test]
fn trusted_sources_come_first() {
    let registry = catalog::default_registry().unwrap();
    let request = QueryRequest::builder()
        .text("dot-com")
        .date_from(date(2001, 1, 1))
        .date_to(date(2001, 12, 31))
        .build();

    let plan = plan(&registry, &request).unwrap();

    assert_eq!(
        plan.source_ids(),
        vec![
            catalog::WAYBACK_CDX,
            catalog::GUARDIAN_CONTENT,
            catalog::NYT_ARTICLE_SEARCH,
            catalog::BING_WEB,
            catalog::SERPER_WEB,
            catalog::GDELT_EVENTS,
        ]
    );
}

#[test]
fn planning_twice_gives_the_same_plan() {
    let registry = catalog::default_registry().unwrap();
    let request = QueryRequest::builder()
        .text("Berlin Wall")
        .date_from(date(1989, 11, 1))
        .date_to(date(1990, 10, 3))
        .granularity_preference(Granularity::Snippet)
        .build();

    let first = plan(&registry, &request).unwrap();
    let second = plan(&registry, &request).unwrap();

    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Granularity preference
// ---------------------------------------------------------------------------

#[test]
fn full_text_preference_without_full_text_source_degrades() {
    let registry = SourceRegistry::from_descriptors([
        source("events", ProviderKind::GdeltEvents, date(1979, 1, 1), Granularity::MetadataOnly),
        source("articles", ProviderKind::NytArticleSearch, date(1851, 9, 18), Granularity::Snippet),
    ])
    .unwrap();
    let request = QueryRequest::builder()
        .text("summit")
        .date_from(date(1990, 1, 1))
        .date_to(date(1995, 12, 31))
        .granularity_preference(Granularity::FullText)
        .build();

    let plan = plan(&registry, &request).unwrap();

    assert!(plan.is_degraded());
    assert_eq!(plan.source_ids(), vec!["articles", "events"]);
}

#[test]
fn snippet_preference_drops_metadata_only_sources() {
    let registry = catalog::default_registry().unwrap();
    let request = QueryRequest::builder()
        .text("Y2K")
        .date_from(date(1999, 6, 1))
        .date_to(date(2000, 1, 31))
        .granularity_preference(Granularity::Snippet)
        .build();

    let plan = plan(&registry, &request).unwrap();

    assert!(!plan.is_degraded());
    assert!(!plan.source_ids().contains(&catalog::WAYBACK_CDX));
    assert!(!plan.source_ids().contains(&catalog::GDELT_EVENTS));
    assert!(plan.source_ids().contains(&catalog::NYT_ARTICLE_SEARCH));
}
