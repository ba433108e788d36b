//! Mapping of parsed CAP trees onto [`Warning`] records.

use crate::error::NormalizationError;
use crate::sources::xml::XmlNode;
use crate::state::types::{
    Area, EventCode, Geocode, InfoBlock, MsgType, Parameter, Severity, Warning,
};

use super::time::parse_cap_time;

/// Geocode kind carrying warn cell ids.
const WARNCELLID: &str = "WARNCELLID";

/// Atom entry context used when the CAP payload lacks a field.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntryContext<'a> {
    /// Atom entry id, used when the alert has no identifier.
    pub id: Option<&'a str>,
    /// Atom entry title, used for info blocks without headline.
    pub title: Option<&'a str>,
    /// Atom `updated`/`published`.
    pub updated: Option<&'a str>,
}

/// `true`/`1`/`yes` (case-insensitive).
fn truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// What: Read one `area` element.
///
/// Details:
/// - `WARNCELLID` geocodes (valueName compared case-insensitively) are split on
///   whitespace and commas and deduplicated in first-seen order.
/// - Other geocodes are preserved verbatim.
fn read_area(node: &XmlNode) -> Area {
    let mut area = Area {
        area_desc: node.field_or_empty("areaDesc"),
        ..Area::default()
    };
    for geo in node.children_named("geocode") {
        let name = geo.field_or_empty("valueName");
        let value = geo.field_or_empty("value");
        if name.trim().eq_ignore_ascii_case(WARNCELLID) {
            for id in value
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
            {
                if !area.cell_ids.iter().any(|c| c == id) {
                    area.cell_ids.push(id.to_string());
                }
            }
        } else if !name.is_empty() || !value.is_empty() {
            area.other_geocodes.push(Geocode {
                value_name: name,
                value,
            });
        }
    }
    area
}

/// What: Read one `info` element.
fn read_info(node: &XmlNode, ctx: &EntryContext<'_>) -> InfoBlock {
    let parameters: Vec<Parameter> = node
        .children_named("parameter")
        .map(|p| Parameter {
            value_name: p.field_or_empty("valueName"),
            value: p.field_or_empty("value"),
            unit: p.field("unit").map(ToString::to_string),
        })
        .collect();
    let past = node.field("past").is_some_and(truthy)
        || parameters
            .iter()
            .any(|p| p.value_name.eq_ignore_ascii_case("past") && truthy(&p.value));
    let headline = node
        .field("headline")
        .or(ctx.title)
        .unwrap_or_default()
        .to_string();
    InfoBlock {
        language: node.field_or_empty("language"),
        category: node.field_or_empty("category"),
        event: node.field_or_empty("event"),
        urgency: node.field_or_empty("urgency"),
        severity: Severity::from_cap(node.field("severity").unwrap_or_default()),
        certainty: node.field_or_empty("certainty"),
        headline,
        description: node.field_or_empty("description"),
        instruction: node.field_or_empty("instruction"),
        effective: node.field("effective").and_then(parse_cap_time),
        onset: node.field("onset").and_then(parse_cap_time),
        expires: node.field("expires").and_then(parse_cap_time),
        sender_name: node.field_or_empty("senderName"),
        web: node.field_or_empty("web"),
        contact: node.field_or_empty("contact"),
        past,
        areas: node.children_named("area").map(read_area).collect(),
        event_codes: node
            .children_named("eventCode")
            .map(|c| EventCode {
                value_name: c.field_or_empty("valueName"),
                value: c.field_or_empty("value"),
            })
            .collect(),
        parameters,
    }
}

/// What: Normalize a CAP alert tree into a [`Warning`].
///
/// Inputs:
/// - `node`: The `alert` element or any ancestor of it.
/// - `source`: Source label stored on the warning.
///
/// Output:
/// - `Ok(Some(Warning))`, or `Ok(None)` when no `alert` element exists.
///
/// # Errors
/// - `NormalizationError::NoInfo` when the alert carries no `info` block.
pub fn normalize(node: &XmlNode, source: &str) -> Result<Option<Warning>, NormalizationError> {
    normalize_entry(node, source, &EntryContext::default())
}

/// What: Normalize a CAP alert using Atom entry context for missing fields.
///
/// Inputs:
/// - `node`: The `alert` element or any ancestor of it.
/// - `source`: Source label stored on the warning.
/// - `ctx`: Entry id/title/updated fallbacks.
///
/// Output:
/// - Same as [`normalize`].
///
/// # Errors
/// - `NormalizationError::NoInfo` when the alert carries no `info` block.
///
/// Details:
/// - Every CAP field is read unprefixed first, then `cap:`-prefixed.
/// - `info`, `area`, `geocode`, `parameter` and `eventCode` are always read as sequences.
/// - Info blocks without event or headline are kept.
pub fn normalize_entry(
    node: &XmlNode,
    source: &str,
    ctx: &EntryContext<'_>,
) -> Result<Option<Warning>, NormalizationError> {
    let Some(alert) = node.find("alert") else {
        return Ok(None);
    };
    let identifier = alert
        .field("identifier")
        .or(ctx.id)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let infos: Vec<InfoBlock> = alert
        .children_named("info")
        .map(|i| read_info(i, ctx))
        .collect();
    if infos.is_empty() {
        return Err(NormalizationError::NoInfo(
            identifier.unwrap_or_else(|| source.to_string()),
        ));
    }
    Ok(Some(Warning {
        identifier,
        sender: alert.field_or_empty("sender"),
        sent_at: alert.field("sent").and_then(parse_cap_time),
        updated: ctx.updated.and_then(parse_cap_time),
        status: alert.field_or_empty("status"),
        msg_type: MsgType::from_cap(alert.field("msgType").unwrap_or_default()),
        scope: alert.field_or_empty("scope"),
        references: alert.field_or_empty("references"),
        note: alert.field_or_empty("note"),
        source: source.to_string(),
        infos,
    }))
}
