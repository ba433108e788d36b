//! Network capability and the "latest pointer" fallback.

mod http;
mod index;
mod memory;

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::error::FetchError;

pub use http::HttpFetcher;
pub use index::{IndexPattern, TS_PLACEHOLDER, fetch_newest_indexed, join_url};
pub use memory::MemoryFetcher;

/// "Fetch bytes from URL" capability.
///
/// Implementations apply `timeout` to the whole call and report every
/// non-2xx answer as a [`FetchError`] carrying the status code.
pub trait Fetcher: Send + Sync {
    /// What: Retrieve the body of `url`.
    ///
    /// Inputs:
    /// - `url`: Absolute URL.
    /// - `timeout`: Deadline for the call.
    ///
    /// Output:
    /// - Body bytes on 2xx; `FetchError` otherwise.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// Directory listing used when the primary "latest" URL answers 404.
#[derive(Clone, Debug)]
pub struct IndexSource {
    /// Directory URL.
    pub base_dir: String,
    /// File name pattern with embedded timestamp.
    pub pattern: IndexPattern,
}

/// Bytes fetched for a run, tagged with their origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched {
    /// URL the bytes came from.
    pub url: String,
    /// Body.
    pub bytes: Vec<u8>,
    /// `true` when served by the index fallback; the newest discoverable file,
    /// not necessarily the newest publication.
    pub stale: bool,
}

/// What: Fetch the primary URL, falling back to the newest indexed file on 404.
///
/// Inputs:
/// - `fetcher`: Network capability.
/// - `primary_url`: "Latest" pointer URL.
/// - `index`: Directory listing to consult on 404; `None` disables the fallback.
/// - `timeout`: Per-call deadline.
///
/// Output:
/// - `Fetched` with `stale=false` from the primary, `stale=true` from the fallback.
///
/// # Errors
/// - Non-404 statuses and transport failures of the primary propagate unchanged.
/// - Errors of the listing or of the fallback download propagate.
pub async fn fetch_with_fallback(
    fetcher: &dyn Fetcher,
    primary_url: &str,
    index: Option<&IndexSource>,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    match fetcher.fetch(primary_url, timeout).await {
        Ok(bytes) => Ok(Fetched {
            url: primary_url.to_string(),
            bytes,
            stale: false,
        }),
        Err(e) if e.is_not_found() => {
            let Some(index) = index else {
                return Err(e);
            };
            warn!(
                url = primary_url,
                base_dir = %index.base_dir,
                "primary answered 404, consulting directory index"
            );
            let url = fetch_newest_indexed(fetcher, &index.base_dir, &index.pattern, timeout).await?;
            let bytes = fetcher.fetch(&url, timeout).await?;
            info!(url = %url, bytes = bytes.len(), "fetched fallback file");
            Ok(Fetched {
                url,
                bytes,
                stale: true,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an index source for `http://h/dir/`.
    fn index() -> IndexSource {
        IndexSource {
            base_dir: "http://h/dir/".into(),
            pattern: IndexPattern::new("A_{ts}_B.zip").expect("valid pattern"),
        }
    }

    #[tokio::test]
    /// What: 404 on the primary falls back to the newest indexed file.
    ///
    /// Inputs:
    /// - Primary missing, listing with two files, newest file served.
    ///
    /// Output:
    /// - Bytes of the newest file, tagged stale, fetched after the listing.
    async fn falls_back_on_404() {
        let f = MemoryFetcher::new();
        f.set_status("http://h/dir/A_LATEST_B.zip", 404);
        f.set_body(
            "http://h/dir/",
            "A_20240101000000_B.zip A_20240102000000_B.zip",
        );
        f.set_body("http://h/dir/A_20240102000000_B.zip", b"new".to_vec());
        let got = fetch_with_fallback(
            &f,
            "http://h/dir/A_LATEST_B.zip",
            Some(&index()),
            Duration::from_secs(1),
        )
        .await
        .expect("fallback succeeds");
        assert!(got.stale);
        assert_eq!(got.bytes, b"new");
        assert_eq!(got.url, "http://h/dir/A_20240102000000_B.zip");
        assert_eq!(
            f.calls(),
            vec![
                "http://h/dir/A_LATEST_B.zip",
                "http://h/dir/",
                "http://h/dir/A_20240102000000_B.zip"
            ]
        );
    }

    #[tokio::test]
    async fn server_error_propagates_without_fallback() {
        let f = MemoryFetcher::new();
        f.set_status("http://h/latest.zip", 500);
        let err = fetch_with_fallback(&f, "http://h/latest.zip", Some(&index()), Duration::from_secs(1))
            .await
            .expect_err("500 is not retried");
        assert_eq!(err.status, Some(500));
        assert_eq!(f.calls().len(), 1);
    }

    #[tokio::test]
    async fn primary_success_is_not_stale() {
        let f = MemoryFetcher::new();
        f.set_body("http://h/latest.zip", b"x".to_vec());
        let got = fetch_with_fallback(&f, "http://h/latest.zip", None, Duration::from_secs(1))
            .await
            .expect("primary ok");
        assert!(!got.stale);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let f = MemoryFetcher::new();
        f.set_body("http://h/slow", b"x".to_vec());
        f.set_delay("http://h/slow", Duration::from_millis(200));
        let err = f
            .fetch("http://h/slow", Duration::from_millis(20))
            .await
            .expect_err("deadline exceeded");
        assert!(err.is_timeout());
    }
}
