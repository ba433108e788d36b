//! Tests for CAP normalization.

use super::*;
use crate::error::NormalizationError;
use crate::sources::xml::parse_tree;
use crate::state::types::{MsgType, Severity};

/// DWD-style alert with a prefixed namespace, two info blocks and mixed geocodes.
const PREFIXED_ALERT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cap:alert xmlns:cap="urn:oasis:names:tc:emergency:cap:1.2">
  <cap:identifier>2.49.0.0.276.0.DWD.PVW.1714557600000.abc</cap:identifier>
  <cap:sender>opendata@dwd.de</cap:sender>
  <cap:sent>2024-05-01T12:00:00+02:00</cap:sent>
  <cap:status>Actual</cap:status>
  <cap:msgType>Update</cap:msgType>
  <cap:scope>Public</cap:scope>
  <cap:info>
    <cap:language>de-DE</cap:language>
    <cap:category>Met</cap:category>
    <cap:event>STURMBÖEN</cap:event>
    <cap:urgency>Immediate</cap:urgency>
    <cap:severity>moderate</cap:severity>
    <cap:certainty>Likely</cap:certainty>
    <cap:eventCode><cap:valueName>II</cap:valueName><cap:value>52</cap:value></cap:eventCode>
    <cap:onset>2024-05-01T14:00:00+02:00</cap:onset>
    <cap:expires>2024-05-01T20:00:00+02:00</cap:expires>
    <cap:senderName>Deutscher Wetterdienst</cap:senderName>
    <cap:headline>Amtliche WARNUNG vor STURMBÖEN</cap:headline>
    <cap:parameter><cap:valueName>gusts</cap:valueName><cap:value>75</cap:value><cap:unit>km/h</cap:unit></cap:parameter>
    <cap:area>
      <cap:areaDesc>Stadt Musterhausen</cap:areaDesc>
      <cap:geocode><cap:valueName>WARNCELLID</cap:valueName><cap:value>805362004</cap:value></cap:geocode>
      <cap:geocode><cap:valueName>warncellid</cap:valueName><cap:value>805362004, 805362008</cap:value></cap:geocode>
      <cap:geocode><cap:valueName>SHN</cap:valueName><cap:value>053620004004</cap:value></cap:geocode>
    </cap:area>
  </cap:info>
  <cap:info>
    <cap:language>en-GB</cap:language>
    <cap:event>GUSTS</cap:event>
    <cap:severity>Extreme</cap:severity>
  </cap:info>
</cap:alert>"#;

#[test]
/// What: Normalize a prefixed DWD alert into the canonical record.
///
/// Inputs:
/// - `PREFIXED_ALERT` with two info blocks.
///
/// Output:
/// - All header fields, both info blocks, split and deduplicated cell ids, other geocodes kept.
fn normalizes_prefixed_alert() {
    let root = parse_tree(PREFIXED_ALERT).expect("fixture parses");
    let w = normalize(&root, "test").expect("no error").expect("alert present");
    assert_eq!(
        w.identifier.as_deref(),
        Some("2.49.0.0.276.0.DWD.PVW.1714557600000.abc")
    );
    assert_eq!(w.sender, "opendata@dwd.de");
    assert_eq!(w.msg_type, MsgType::Update);
    assert_eq!(w.source, "test");
    assert!(w.sent_at.is_some());
    assert_eq!(w.infos.len(), 2);

    let de = &w.infos[0];
    assert_eq!(de.event, "STURMBÖEN");
    assert_eq!(de.severity, Severity::Moderate);
    assert_eq!(de.severity_level(), 3);
    assert_eq!(de.event_codes.len(), 1);
    assert_eq!(de.parameters[0].unit.as_deref(), Some("km/h"));
    assert_eq!(de.areas.len(), 1);
    assert_eq!(de.areas[0].cell_ids, vec!["805362004", "805362008"]);
    assert_eq!(de.areas[0].other_geocodes.len(), 1);
    assert!(de.onset.is_some() && de.expires.is_some());

    let en = &w.infos[1];
    assert_eq!(en.severity_level(), 5);
    assert!(en.areas.is_empty());
    assert_eq!(w.max_severity(), 5);
}

#[test]
/// What: Unprefixed spelling wins when both spellings are present.
fn unprefixed_field_wins() {
    let xml = r"<alert><identifier>x</identifier>
        <info><cap:event>PREFIXED</cap:event><event>PLAIN</event></info></alert>";
    let root = parse_tree(xml).expect("parses");
    let w = normalize(&root, "s").expect("ok").expect("alert");
    assert_eq!(w.infos[0].event, "PLAIN");
}

#[test]
fn missing_alert_yields_none() {
    let root = parse_tree("<entry><title>x</title></entry>").expect("parses");
    assert_eq!(normalize(&root, "s"), Ok(None));
}

#[test]
fn alert_without_info_is_an_error() {
    let root = parse_tree("<alert><identifier>x</identifier></alert>").expect("parses");
    assert_eq!(
        normalize(&root, "s"),
        Err(NormalizationError::NoInfo("x".into()))
    );
}

#[test]
/// What: Entry context fills identifier, headline and update time.
///
/// Inputs:
/// - Alert without identifier and headline, plus an entry context.
///
/// Output:
/// - Fallback values taken from the entry; empty-event blocks retained.
fn entry_context_fallbacks() {
    let root = parse_tree("<alert><info><severity>Bogus</severity></info></alert>").expect("parses");
    let ctx = EntryContext {
        id: Some("entry-7"),
        title: Some("Warnung"),
        updated: Some("2024-05-01T10:00:00Z"),
    };
    let w = normalize_entry(&root, "atom", &ctx).expect("ok").expect("alert");
    assert_eq!(w.identifier.as_deref(), Some("entry-7"));
    assert_eq!(w.infos[0].headline, "Warnung");
    assert_eq!(w.infos[0].event, "");
    assert_eq!(w.infos[0].severity_level(), 0);
    assert!(w.updated.is_some());
}

#[test]
fn past_flag_from_element_or_parameter() {
    let xml = r"<alert><info><past>true</past></info>
        <info><parameter><valueName>PAST</valueName><value>yes</value></parameter></info>
        <info><past>false</past></info></alert>";
    let root = parse_tree(xml).expect("parses");
    let w = normalize(&root, "s").expect("ok").expect("alert");
    let flags: Vec<bool> = w.infos.iter().map(|i| i.past).collect();
    assert_eq!(flags, vec![true, true, false]);
}

#[test]
/// What: Serializing and re-normalizing preserves identifier, severity and cell ids.
///
/// Inputs:
/// - Normalized `PREFIXED_ALERT`.
///
/// Output:
/// - Re-normalized warning with equal identifier, per-block severity levels and cell id sets.
fn serialization_round_trip_preserves_key_fields() {
    let root = parse_tree(PREFIXED_ALERT).expect("fixture parses");
    let original = normalize(&root, "s").expect("ok").expect("alert");
    let xml = to_cap_xml(&original).expect("serializes");
    let again_root = parse_tree(&xml).expect("serialized output parses");
    let again = normalize(&again_root, "s").expect("ok").expect("alert");
    assert_eq!(again.identifier, original.identifier);
    let levels = |w: &crate::state::types::Warning| {
        w.infos.iter().map(|i| i.severity_level()).collect::<Vec<_>>()
    };
    assert_eq!(levels(&again), levels(&original));
    let cells = |w: &crate::state::types::Warning| {
        w.areas().flat_map(|a| a.cell_ids.clone()).collect::<Vec<_>>()
    };
    assert_eq!(cells(&again), cells(&original));
    assert_eq!(again.infos[0].onset, original.infos[0].onset);
}
