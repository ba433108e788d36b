use chrono::{Duration, TimeZone, Utc};

use super::*;
use crate::error::ConfigurationError;
use crate::state::{Area, InfoBlock, MatchTier, Warning};

/// Build a warning with one info block and one area.
fn warning(id: Option<&str>, cells: &[&str], desc: &str) -> Warning {
    Warning {
        identifier: id.map(ToString::to_string),
        infos: vec![InfoBlock {
            event: "FROST".into(),
            areas: vec![Area {
                area_desc: desc.into(),
                cell_ids: cells.iter().map(ToString::to_string).collect(),
                other_geocodes: Vec::new(),
            }],
            ..InfoBlock::default()
        }],
        ..Warning::default()
    }
}

fn filter(id: &str, name_fallback: bool, names: &[&str]) -> RegionFilter {
    let names: Vec<String> = names.iter().map(ToString::to_string).collect();
    RegionFilter::new(Some(id), false, name_fallback, &names).expect("valid filter")
}

#[test]
/// What: Exact id, non-matching id and name fallback behave per the matching rules.
///
/// Inputs:
/// - Filter `805362004`, warnings with cell sets `{805362004}` and `{805362005}`.
///
/// Output:
/// - Exact hit matches; the neighbour only matches once name fallback is on
///   and its `areaDesc` contains the token.
fn matches_exact_and_name_fallback() {
    let hit = warning(Some("a"), &["805362004"], "Gemeinde A");
    let miss = warning(Some("b"), &["805362005"], "Stadt Musterhausen");
    assert!(matches(&hit, &filter("805362004", false, &[])));
    assert!(!matches(&miss, &filter("805362004", false, &[])));
    assert!(matches(&miss, &filter("805362004", true, &["musterhausen"])));
    assert_eq!(
        classify(&miss, &filter("805362004", true, &["Musterhausen"])),
        Some(MatchTier::Name)
    );
}

#[test]
/// What: Parent id is derived and reported as its own tier.
///
/// Inputs:
/// - Municipality id `805362004` with parent matching on.
///
/// Output:
/// - Parent `105362000`; a district-only warning classifies as `Parent`,
///   a warning listing both classifies as `Exact`.
fn parent_tier_is_distinct() {
    let f = RegionFilter::new(Some("805362004"), true, false, &[]).expect("valid filter");
    assert_eq!(f.parent_id.as_deref(), Some("105362000"));
    let district = warning(Some("d"), &["105362000"], "Kreis");
    assert_eq!(classify(&district, &f), Some(MatchTier::Parent));
    let both = warning(Some("b"), &["105362000", "805362004"], "Kreis");
    assert_eq!(classify(&both, &f), Some(MatchTier::Exact));
}

#[test]
fn derive_parent_only_for_municipalities() {
    assert_eq!(derive_parent("812345678").as_deref(), Some("112345000"));
    assert_eq!(derive_parent("112345000"), None);
    assert_eq!(derive_parent("8123"), None);
}

#[test]
/// What: Filter validation rejects malformed ids and empty filters.
fn filter_validation() {
    assert_eq!(
        RegionFilter::new(Some("80536200"), false, false, &[]),
        Err(ConfigurationError::InvalidRegionId("80536200".into()))
    );
    assert_eq!(
        RegionFilter::new(Some("80536200x"), false, false, &[]),
        Err(ConfigurationError::InvalidRegionId("80536200x".into()))
    );
    assert_eq!(
        RegionFilter::new(Some("  "), false, true, &[]),
        Err(ConfigurationError::EmptyFilter)
    );
    let names = vec![" Berlin ".to_string(), "berlin".to_string(), String::new()];
    let f = RegionFilter::new(None, true, true, &names).expect("names alone suffice");
    assert_eq!(f.area_names, vec!["berlin".to_string()]);
    assert!(f.parent_id.is_none());
}

#[test]
/// What: Temporal rule over onset/expiry/past combinations.
///
/// Inputs:
/// - Future onset without expiry, fully past window, no timestamps, past flag
///   with future expiry, past onset with future expiry.
///
/// Output:
/// - true, false, true, false, true.
fn active_or_future_rules() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date");
    let future = InfoBlock {
        onset: Some(now + Duration::hours(1)),
        ..InfoBlock::default()
    };
    let expired = InfoBlock {
        onset: Some(now - Duration::hours(2)),
        expires: Some(now - Duration::hours(1)),
        ..InfoBlock::default()
    };
    let unknown = InfoBlock::default();
    let flagged = InfoBlock {
        past: true,
        expires: Some(now + Duration::hours(3)),
        ..InfoBlock::default()
    };
    let ongoing = InfoBlock {
        onset: Some(now - Duration::hours(1)),
        expires: Some(now + Duration::hours(1)),
        ..InfoBlock::default()
    };
    assert!(is_active_or_future(&future, now));
    assert!(!is_active_or_future(&expired, now));
    assert!(is_active_or_future(&unknown, now));
    assert!(!is_active_or_future(&flagged, now));
    assert!(is_active_or_future(&ongoing, now));

    let mixed = Warning {
        infos: vec![expired, ongoing],
        ..Warning::default()
    };
    assert!(warning_is_current(&mixed, now));
}

#[test]
/// What: Deduplication keeps first occurrences and is idempotent.
///
/// Inputs:
/// - Two warnings sharing id `x`, one with id `y`, two distinct anonymous ones
///   and an exact anonymous duplicate.
///
/// Output:
/// - Four warnings; a second pass changes nothing.
fn dedupe_is_idempotent() {
    let input = vec![
        warning(Some("x"), &["1"], "first"),
        warning(None, &["2"], "anon one"),
        warning(Some("x"), &["3"], "second"),
        warning(Some("y"), &["4"], "y"),
        warning(None, &["5"], "anon two"),
        warning(None, &["2"], "anon one"),
    ];
    let once = dedupe(input.clone());
    assert_eq!(once.len(), 4);
    assert!(once.len() <= input.len());
    assert_eq!(once[0].infos[0].areas[0].area_desc, "first");
    assert_eq!(dedupe(once.clone()), once);
}
