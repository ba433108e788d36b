//! `reqwest`-backed fetcher.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{info, warn};

use super::Fetcher;
use crate::error::FetchError;

/// Connect timeout applied below the per-call deadline.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP(S) fetcher with a pooled client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    /// Shared client; connection pooling is on by default.
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// What: Build a fetcher with a `capwarn/<version>` user agent.
    ///
    /// Output:
    /// - Ready fetcher. If the tuned client cannot be built, a default client is used.
    #[must_use]
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/cap+xml,application/atom+xml,application/xml;q=0.9,application/zip,*/*;q=0.8",
            ),
        );
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(format!("capwarn/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build tuned HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { client }
    }
}

/// What: Map a `reqwest` error to a transport `FetchError`.
fn transport_error(url: &str, e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::transport(url, "request timed out")
    } else {
        FetchError::transport(url, format!("network error: {e}"))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| {
                    warn!(url, error = %e, "request failed");
                    transport_error(url, &e)
                })?;
            let status = response.status();
            if !status.is_success() {
                warn!(url, status = status.as_u16(), "non-success status");
                return Err(FetchError::http(url, status.as_u16()));
            }
            let body = response.bytes().await.map_err(|e| {
                warn!(url, error = %e, "failed to read response body");
                transport_error(url, &e)
            })?;
            info!(url, bytes = body.len(), "fetched");
            Ok(body.to_vec())
        })
    }
}
