//! CAP timestamp parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

/// What: Parse a CAP/Atom timestamp into UTC.
///
/// Inputs:
/// - `raw`: Timestamp text (`2024-05-01T12:00:00+02:00`, `2024-05-01T10:00:00Z`, ...).
///
/// Output:
/// - `Some(DateTime<Utc>)` when parseable, `None` for empty or unparseable input.
///
/// Details:
/// - RFC 3339 first; timestamps without offset are read as UTC.
pub fn parse_cap_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    debug!(raw = s, "unparseable CAP timestamp");
    None
}
