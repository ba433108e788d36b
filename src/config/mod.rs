//! Settings file, CLI overrides and on-disk locations.

mod parse;
pub mod paths;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConfigurationError;
use crate::sources::{IndexPattern, IndexSource};

pub use parse::{parse_bool, parse_settings, strip_inline_comment};
pub use paths::{config_dir, logs_dir, resolve_config_path, state_dir};

/// Default feed: CAP alerts of the last 90 minutes as Atom.
pub const DEFAULT_FEED_URL: &str = "https://www.dwd.de/DWD/warnungen/cap/last90minutes/cap_de.atom";

/// Instance configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// 9-digit warn cell id.
    pub region_id: Option<String>,
    /// Also match the derived district id.
    pub match_parent: bool,
    /// Match `areaDesc` against `area_names`.
    pub name_fallback: bool,
    /// Area-name tokens.
    pub area_names: Vec<String>,
    /// Drop warnings that are neither active nor upcoming.
    pub only_active_future: bool,
    /// Re-deliver the last good result when a run fails.
    pub allow_stale: bool,
    /// Run once when the instance starts.
    pub run_on_startup: bool,
    /// Polling interval; `<= 0` disables the timer.
    pub refresh_interval_secs: i64,
    /// Per-call network timeout.
    pub timeout_ms: u64,
    /// Primary feed URL.
    pub feed_url: String,
    /// Directory index consulted when `feed_url` answers 404.
    pub index_dir: Option<String>,
    /// File name pattern with `{ts}` inside `index_dir`.
    pub index_pattern: Option<String>,
    /// Concurrent link-follow fetches per run.
    pub link_concurrency: usize,
    /// Delay before the single retry after a parse failure.
    pub retry_delay_ms: u64,
    /// Keep the last good result on disk across restarts.
    pub persist_result: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region_id: None,
            match_parent: false,
            name_fallback: false,
            area_names: Vec::new(),
            only_active_future: true,
            allow_stale: true,
            run_on_startup: true,
            refresh_interval_secs: 300,
            timeout_ms: 15_000,
            feed_url: DEFAULT_FEED_URL.to_string(),
            index_dir: None,
            index_pattern: None,
            link_concurrency: 4,
            retry_delay_ms: 2_000,
            persist_result: true,
        }
    }
}

impl Settings {
    /// What: Build the directory-index fallback, if configured.
    ///
    /// Output:
    /// - `Ok(None)` unless both `index_dir` and `index_pattern` are set.
    ///
    /// # Errors
    /// - `InvalidIndexPattern` when the pattern lacks `{ts}`.
    pub fn index_source(&self) -> Result<Option<IndexSource>, ConfigurationError> {
        let (Some(dir), Some(pattern)) = (self.index_dir.as_deref(), self.index_pattern.as_deref())
        else {
            return Ok(None);
        };
        Ok(Some(IndexSource {
            base_dir: dir.to_string(),
            pattern: IndexPattern::new(pattern)?,
        }))
    }
}

/// What: Load settings from `explicit` or the default config location.
///
/// Inputs:
/// - `explicit`: Path passed with `--config`.
///
/// Output:
/// - Parsed settings; defaults when no file exists or it cannot be read.
///
/// Details:
/// - An explicit path that cannot be read is logged at `warn`; a missing
///   default file is silent.
#[must_use]
pub fn load_settings(explicit: Option<&Path>) -> Settings {
    let mut out = Settings::default();
    let path: Option<PathBuf> = explicit.map(Path::to_path_buf).or_else(resolve_config_path);
    let Some(p) = path else {
        debug!("no config file found, using defaults");
        return out;
    };
    match fs::read_to_string(&p) {
        Ok(content) => {
            debug!(path = %p.display(), bytes = content.len(), "loaded config");
            parse_settings(&content, &mut out);
        }
        Err(e) if explicit.is_some() => {
            warn!(path = %p.display(), error = %e, "config unreadable, using defaults");
        }
        Err(e) => {
            debug!(path = %p.display(), error = %e, "config unreadable, using defaults");
        }
    }
    out
}

#[cfg(test)]
mod tests;
