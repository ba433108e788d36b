//! Identifier-based deduplication.

use std::collections::HashSet;

use tracing::debug;

use crate::state::Warning;

/// What: Key a warning for deduplication.
///
/// Details:
/// - Uses the identifier when present. Anonymous warnings fall back to their
///   full JSON serialization, so distinct anonymous alerts never collapse.
fn dedup_key(warning: &Warning) -> String {
    match &warning.identifier {
        Some(id) => format!("id:{id}"),
        None => format!(
            "anon:{}",
            serde_json::to_string(warning).unwrap_or_else(|_| format!("{warning:?}"))
        ),
    }
}

/// What: Drop later warnings sharing a key with an earlier one.
///
/// Inputs:
/// - `warnings`: Warnings in pipeline order.
///
/// Output:
/// - First occurrence of each key, original order kept.
#[must_use]
pub fn dedupe(warnings: Vec<Warning>) -> Vec<Warning> {
    let before = warnings.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let out: Vec<Warning> = warnings
        .into_iter()
        .filter(|w| seen.insert(dedup_key(w)))
        .collect();
    if out.len() < before {
        debug!(dropped = before - out.len(), "removed duplicate warnings");
    }
    out
}
