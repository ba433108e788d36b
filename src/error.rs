//! Error taxonomy for the warning pipeline.
//!
//! Per-entry errors (`ArchiveError` for a single member, `ParseError` for a
//! single linked document, `NormalizationError`) are caught where they occur
//! and recorded in run metadata. Run-level errors are collected in
//! [`PipelineError`] and decide whether a run ends in `Failed`.

use thiserror::Error;

/// Network, timeout or non-2xx failure of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// HTTP status code when the server answered; `None` for transport failures.
    pub status: Option<u16>,
    /// URL that was requested.
    pub url: String,
    /// Human readable cause.
    pub message: String,
}

impl FetchError {
    /// What: Build an error for a non-2xx response.
    ///
    /// Inputs:
    /// - `url`: Requested URL.
    /// - `status`: Status code returned by the server.
    ///
    /// Output:
    /// - `FetchError` carrying the status code.
    #[must_use]
    pub fn http(url: &str, status: u16) -> Self {
        Self {
            status: Some(status),
            url: url.to_string(),
            message: format!("HTTP {status}"),
        }
    }

    /// What: Build an error for a failure below the HTTP layer (DNS, connect, timeout, body read).
    #[must_use]
    pub fn transport(url: &str, message: impl Into<String>) -> Self {
        Self {
            status: None,
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// `true` when the server answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status, Some(404))
    }

    /// `true` when the request hit its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status.is_none() && self.message.contains("timed out")
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {code} for {}", self.url),
            None => write!(f, "{} for {}", self.message, self.url),
        }
    }
}

impl std::error::Error for FetchError {}

/// Failure to open a ZIP archive at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("corrupt archive: {0}")]
pub struct ArchiveError(pub String);

/// Both the raw and the sanitized parse attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("XML parse failed: {message} (after sanitizing: {sanitized_message})")]
pub struct ParseError {
    /// Error reported for the raw document.
    pub message: String,
    /// Error reported for the sanitized document.
    pub sanitized_message: String,
}

/// A malformed alert subtree; caught per alert so one bad alert never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The alert element carries no `info` block.
    #[error("alert {0} has no info block")]
    NoInfo(String),
}

/// Invalid region filter configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Region id is not a 9 digit cell id.
    #[error("invalid region id {0:?}: expected 9 digits")]
    InvalidRegionId(String),
    /// Neither a region id nor any area name was configured.
    #[error("no region id and no area names configured")]
    EmptyFilter,
    /// Directory-index pattern lacks the `{ts}` placeholder or does not compile.
    #[error("invalid index pattern {0:?}")]
    InvalidIndexPattern(String),
}

/// Run-level failure; a run ending with one of these transitions to `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Primary source could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Primary payload was a ZIP that could not be opened.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// Primary document could not be parsed even after sanitizing.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PipelineError {
    /// `true` for parse failures, the only kind the scheduler retries once.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Check status helpers and `Display` output of `FetchError`.
    ///
    /// Inputs:
    /// - A 404 error, a 500 error and a transport timeout.
    ///
    /// Output:
    /// - Only the 404 reports `is_not_found`; only the timeout reports `is_timeout`.
    fn fetch_error_helpers() {
        let nf = FetchError::http("http://x/latest.zip", 404);
        let se = FetchError::http("http://x/latest.zip", 500);
        let to = FetchError::transport("http://x/a", "request timed out");
        assert!(nf.is_not_found());
        assert!(!se.is_not_found());
        assert!(to.is_timeout());
        assert!(!se.is_timeout());
        assert_eq!(se.to_string(), "HTTP 500 for http://x/latest.zip");
        assert_eq!(to.to_string(), "request timed out for http://x/a");
    }

    #[test]
    fn pipeline_error_wraps_parse() {
        let err: PipelineError = ParseError {
            message: "a".into(),
            sanitized_message: "b".into(),
        }
        .into();
        assert!(err.is_parse());
        let fetch: PipelineError = FetchError::http("u", 500).into();
        assert!(!fetch.is_parse());
    }
}
