//! Directory-index discovery of the newest timestamped file.

use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use super::Fetcher;
use crate::error::{ConfigurationError, FetchError};

/// Placeholder marking the 14-digit timestamp in an index pattern.
pub const TS_PLACEHOLDER: &str = "{ts}";

/// File name pattern `PREFIX{ts}SUFFIX` with an embedded `YYYYMMDDhhmmss` timestamp.
#[derive(Clone, Debug)]
pub struct IndexPattern {
    /// Template as configured.
    template: String,
    /// Compiled matcher; group 1 is the file name, group 2 the timestamp.
    regex: Regex,
}

impl IndexPattern {
    /// What: Compile a `PREFIX{ts}SUFFIX` template.
    ///
    /// Inputs:
    /// - `template`: e.g. `Z_CAP_C_EDZW_{ts}_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip`.
    ///
    /// Output:
    /// - Compiled pattern.
    ///
    /// # Errors
    /// - `ConfigurationError::InvalidIndexPattern` when `{ts}` is missing or
    ///   the prefix is empty.
    pub fn new(template: &str) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidIndexPattern(template.to_string());
        let (prefix, suffix) = template.split_once(TS_PLACEHOLDER).ok_or_else(invalid)?;
        if prefix.is_empty() || suffix.contains(TS_PLACEHOLDER) {
            return Err(invalid());
        }
        let regex = Regex::new(&format!(
            r"({}(\d{{14}}){})",
            regex::escape(prefix),
            regex::escape(suffix)
        ))
        .map_err(|_| invalid())?;
        Ok(Self {
            template: template.to_string(),
            regex,
        })
    }

    /// Template as configured.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// What: List `(file_name, timestamp)` matches in listing order, duplicates removed.
    #[must_use]
    pub fn matches(&self, listing: &str) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        for cap in self.regex.captures_iter(listing) {
            let (Some(name), Some(ts)) = (cap.get(1), cap.get(2)) else {
                continue;
            };
            if !out.iter().any(|(n, _)| n == name.as_str()) {
                out.push((name.as_str().to_string(), ts.as_str().to_string()));
            }
        }
        out
    }

    /// What: Pick the newest file name in a listing.
    ///
    /// Details:
    /// - Timestamps compare lexicographically; on ties the first file in
    ///   listing order wins.
    #[must_use]
    pub fn newest(&self, listing: &str) -> Option<String> {
        let mut best: Option<(String, String)> = None;
        for (name, ts) in self.matches(listing) {
            if best.as_ref().is_none_or(|(_, b)| ts > *b) {
                best = Some((name, ts));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// Join a directory URL and a file name.
#[must_use]
pub fn join_url(base_dir: &str, name: &str) -> String {
    if base_dir.ends_with('/') {
        format!("{base_dir}{name}")
    } else {
        format!("{base_dir}/{name}")
    }
}

/// What: List a directory index and return the URL of the newest matching file.
///
/// Inputs:
/// - `fetcher`: Network capability.
/// - `base_dir`: Directory URL whose body lists file names.
/// - `pattern`: File name pattern.
/// - `timeout`: Per-call deadline.
///
/// Output:
/// - Absolute URL of the newest match.
///
/// # Errors
/// - Propagates the listing's `FetchError`.
/// - Returns a `FetchError` without status when nothing matches.
///
/// Details:
/// - The listing is treated as plain text; no HTML structure is assumed.
pub async fn fetch_newest_indexed(
    fetcher: &dyn Fetcher,
    base_dir: &str,
    pattern: &IndexPattern,
    timeout: Duration,
) -> Result<String, FetchError> {
    let body = fetcher.fetch(base_dir, timeout).await?;
    let listing = String::from_utf8_lossy(&body);
    let Some(name) = pattern.newest(&listing) else {
        warn!(base_dir, pattern = pattern.template(), "no matching file in index");
        return Err(FetchError::transport(
            base_dir,
            format!("no file matching {} in index", pattern.template()),
        ));
    };
    let url = join_url(base_dir, &name);
    info!(url = %url, "selected newest indexed file");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// DWD-style pattern used across tests.
    const PATTERN: &str = "Z_CAP_C_EDZW_{ts}_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip";

    #[test]
    /// What: Newest timestamp wins regardless of listing order; repeats collapse.
    ///
    /// Inputs:
    /// - HTML listing with three matching files (one repeated in text) and a decoy.
    ///
    /// Output:
    /// - File with the highest timestamp.
    fn picks_newest_timestamp() {
        let pattern = IndexPattern::new(PATTERN).expect("valid pattern");
        let listing = r#"
            <a href="Z_CAP_C_EDZW_20240501100000_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip">Z_CAP_C_EDZW_20240501100000_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip</a>
            <a href="Z_CAP_C_EDZW_20240501120500_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip">x</a>
            <a href="Z_CAP_C_EDZW_20240501110000_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip">x</a>
            <a href="Z_CAP_C_EDZW_LATEST_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip">latest</a>
            <a href="Z_CAP_C_EDZW_20990101000000_PVW_STATUS_PREMIUMDWD_DISTRICT_DE.zip">other</a>
        "#;
        assert_eq!(pattern.matches(listing).len(), 3);
        assert_eq!(
            pattern.newest(listing).as_deref(),
            Some("Z_CAP_C_EDZW_20240501120500_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip")
        );
    }

    #[test]
    fn rejects_templates_without_placeholder() {
        assert!(IndexPattern::new("file.zip").is_err());
        assert!(IndexPattern::new("{ts}.zip").is_err());
        assert!(IndexPattern::new("a_{ts}_{ts}.zip").is_err());
    }

    #[test]
    fn joins_urls() {
        assert_eq!(join_url("http://h/d/", "f.zip"), "http://h/d/f.zip");
        assert_eq!(join_url("http://h/d", "f.zip"), "http://h/d/f.zip");
    }

    #[test]
    fn no_match_in_plain_listing() {
        let pattern = IndexPattern::new(PATTERN).expect("valid pattern");
        assert!(pattern.newest("nothing here").is_none());
    }
}
