//! Serialization of [`Warning`] records back to CAP 1.2 XML.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::state::types::{InfoBlock, MsgType, Severity, Warning};

/// CAP 1.2 namespace.
const CAP_NS: &str = "urn:oasis:names:tc:emergency:cap:1.2";

/// Result type for XML writing.
type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Write `<name>text</name>`, skipping empty text.
fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write a timestamp element when present.
fn time_element<W: Write>(w: &mut Writer<W>, name: &str, t: Option<DateTime<Utc>>) -> Result<()> {
    match t {
        Some(t) => text_element(w, name, &t.to_rfc3339_opts(SecondsFormat::Secs, false)),
        None => Ok(()),
    }
}

/// Write a `valueName`/`value` pair element.
fn pair_element<W: Write>(w: &mut Writer<W>, name: &str, value_name: &str, value: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    text_element(w, "valueName", value_name)?;
    text_element(w, "value", value)?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// CAP spelling of a severity.
const fn severity_text(s: Severity) -> &'static str {
    match s {
        Severity::Unmapped => "",
        Severity::Unknown => "Unknown",
        Severity::Minor => "Minor",
        Severity::Moderate => "Moderate",
        Severity::Severe => "Severe",
        Severity::Extreme => "Extreme",
    }
}

/// Write one `info` block.
fn write_info<W: Write>(w: &mut Writer<W>, info: &InfoBlock) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("info")))?;
    text_element(w, "language", &info.language)?;
    text_element(w, "category", &info.category)?;
    text_element(w, "event", &info.event)?;
    text_element(w, "urgency", &info.urgency)?;
    text_element(w, "severity", severity_text(info.severity))?;
    text_element(w, "certainty", &info.certainty)?;
    for code in &info.event_codes {
        pair_element(w, "eventCode", &code.value_name, &code.value)?;
    }
    time_element(w, "effective", info.effective)?;
    time_element(w, "onset", info.onset)?;
    time_element(w, "expires", info.expires)?;
    text_element(w, "senderName", &info.sender_name)?;
    text_element(w, "headline", &info.headline)?;
    text_element(w, "description", &info.description)?;
    text_element(w, "instruction", &info.instruction)?;
    text_element(w, "web", &info.web)?;
    text_element(w, "contact", &info.contact)?;
    for p in &info.parameters {
        w.write_event(Event::Start(BytesStart::new("parameter")))?;
        text_element(w, "valueName", &p.value_name)?;
        text_element(w, "value", &p.value)?;
        if let Some(unit) = &p.unit {
            text_element(w, "unit", unit)?;
        }
        w.write_event(Event::End(BytesEnd::new("parameter")))?;
    }
    for area in &info.areas {
        w.write_event(Event::Start(BytesStart::new("area")))?;
        text_element(w, "areaDesc", &area.area_desc)?;
        for id in &area.cell_ids {
            pair_element(w, "geocode", "WARNCELLID", id)?;
        }
        for g in &area.other_geocodes {
            pair_element(w, "geocode", &g.value_name, &g.value)?;
        }
        w.write_event(Event::End(BytesEnd::new("area")))?;
    }
    w.write_event(Event::End(BytesEnd::new("info")))?;
    Ok(())
}

/// What: Serialize a warning as a CAP 1.2 `alert` document.
///
/// Inputs:
/// - `warning`: Normalized warning.
///
/// Output:
/// - Indented XML text.
///
/// # Errors
/// - Propagates writer errors (not expected for the in-memory buffer).
///
/// Details:
/// - Normalizing the output again yields the same identifier, severity levels
///   and warn cell ids.
pub fn to_cap_xml(warning: &Warning) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("alert");
    root.push_attribute(("xmlns", CAP_NS));
    w.write_event(Event::Start(root))?;
    text_element(&mut w, "identifier", warning.identifier.as_deref().unwrap_or_default())?;
    text_element(&mut w, "sender", &warning.sender)?;
    time_element(&mut w, "sent", warning.sent_at)?;
    text_element(&mut w, "status", &warning.status)?;
    let msg_type = match warning.msg_type {
        MsgType::Alert => "Alert",
        MsgType::Update => "Update",
        MsgType::Cancel => "Cancel",
        MsgType::Unknown => "",
    };
    text_element(&mut w, "msgType", msg_type)?;
    text_element(&mut w, "scope", &warning.scope)?;
    text_element(&mut w, "note", &warning.note)?;
    text_element(&mut w, "references", &warning.references)?;
    for info in &warning.infos {
        write_info(&mut w, info)?;
    }
    w.write_event(Event::End(BytesEnd::new("alert")))?;
    Ok(String::from_utf8_lossy(&w.into_inner()).into_owned())
}
