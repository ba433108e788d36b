//! Active-or-future filter.

use chrono::{DateTime, Utc};

use crate::state::{InfoBlock, Warning};

/// What: Decide whether an info block is active or still to come.
///
/// Inputs:
/// - `info`: Info block to check.
/// - `now`: Reference instant.
///
/// Output:
/// - `false` when flagged past; `true` when onset or expiry lies after `now`,
///   or when neither is known; `false` otherwise.
#[must_use]
pub fn is_active_or_future(info: &InfoBlock, now: DateTime<Utc>) -> bool {
    if info.past {
        return false;
    }
    if info.onset.is_some_and(|t| t > now) || info.expires.is_some_and(|t| t > now) {
        return true;
    }
    info.onset.is_none() && info.expires.is_none()
}

/// `true` when any info block of the warning is active or future.
#[must_use]
pub fn warning_is_current(warning: &Warning, now: DateTime<Utc>) -> bool {
    warning.infos.iter().any(|i| is_active_or_future(i, now))
}
