use tracing::{debug, warn};

use super::Settings;

/// What: Strip a trailing `#` or `//` comment from a value.
///
/// Details:
/// - Only markers at the start or preceded by whitespace count, so URLs such
///   as `https://host/#frag` survive.
#[must_use]
pub fn strip_inline_comment(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut cut = s.len();
    for (i, _) in s.match_indices(['#', '/']) {
        let starts_comment = bytes[i] == b'#' || s[i..].starts_with("//");
        let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
        if starts_comment && at_boundary {
            cut = i;
            break;
        }
    }
    s[..cut].trim()
}

/// `true`/`1`/`yes`/`on` → `Some(true)`, `false`/`0`/`no`/`off` → `Some(false)`.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Text value or `None` when blank.
fn opt_string(val: &str) -> Option<String> {
    let v = val.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// What: Parse `capwarn.conf` content into `settings`.
///
/// Inputs:
/// - `content`: File content.
/// - `settings`: Settings to update in place.
///
/// Details:
/// - Lines starting with `#`, `//` or `;` and lines without `=` are skipped.
/// - Keys are lowercased with `.`, `-` and spaces mapped to `_`.
/// - Unparseable values keep the current value and log a warning.
pub fn parse_settings(content: &str, settings: &mut Settings) {
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("//")
            || trimmed.starts_with(';')
        {
            continue;
        }
        let Some((raw_key, val_raw)) = trimmed.split_once('=') else {
            continue;
        };
        let key = raw_key.trim().to_lowercase().replace(['.', '-', ' '], "_");
        let val = strip_inline_comment(val_raw.trim());
        let bad = || warn!(key = %key, value = val, "ignoring unparseable config value");
        let set_bool = |slot: &mut bool| match parse_bool(val) {
            Some(b) => *slot = b,
            None => bad(),
        };
        match key.as_str() {
            "region_id" | "warncellid" => settings.region_id = opt_string(val),
            "match_parent" => set_bool(&mut settings.match_parent),
            "name_fallback" | "allow_name_fallback" => set_bool(&mut settings.name_fallback),
            "area_names" => {
                settings.area_names = val
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            "only_active_future" => set_bool(&mut settings.only_active_future),
            "allow_stale" => set_bool(&mut settings.allow_stale),
            "run_on_startup" => set_bool(&mut settings.run_on_startup),
            "refresh_interval_secs" | "refresh_interval" => match val.parse::<i64>() {
                Ok(v) => settings.refresh_interval_secs = v,
                Err(_) => bad(),
            },
            "timeout_ms" => match val.parse::<u64>() {
                Ok(v) if v > 0 => settings.timeout_ms = v,
                _ => bad(),
            },
            "feed_url" => match opt_string(val) {
                Some(v) => settings.feed_url = v,
                None => bad(),
            },
            "index_dir" => settings.index_dir = opt_string(val),
            "index_pattern" => settings.index_pattern = opt_string(val),
            "link_concurrency" => match val.parse::<usize>() {
                Ok(v) if v > 0 => settings.link_concurrency = v,
                _ => bad(),
            },
            "retry_delay_ms" => match val.parse::<u64>() {
                Ok(v) => settings.retry_delay_ms = v,
                Err(_) => bad(),
            },
            "persist_result" => set_bool(&mut settings.persist_result),
            _ => debug!(key = %key, "ignoring unknown config key"),
        }
    }
}
