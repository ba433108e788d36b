//! In-memory fetcher serving scripted responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use super::Fetcher;
use crate::error::FetchError;

/// Scripted response for one URL.
#[derive(Clone, Debug)]
enum Scripted {
    /// 200 with this body.
    Body(Vec<u8>),
    /// Non-2xx status.
    Status(u16),
    /// Transport failure with this message.
    Transport(String),
}

/// Shared state behind a [`MemoryFetcher`].
#[derive(Debug, Default)]
struct Inner {
    /// Responses keyed by URL.
    responses: HashMap<String, Scripted>,
    /// One-shot responses served before `responses`, oldest first.
    queued: HashMap<String, VecDeque<Scripted>>,
    /// Artificial latency per URL.
    delays: HashMap<String, Duration>,
    /// Every URL requested, in call order.
    calls: Vec<String>,
}

/// Fetcher answering from a URL → response table; unknown URLs answer 404.
///
/// Clones share the same table, so a test can rewrite responses while an
/// instance holds the fetcher.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    /// Shared table.
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFetcher {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the locked table; a poisoned lock is recovered.
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Serve `body` with status 200 for `url`.
    pub fn set_body(&self, url: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.with(|i| i.responses.insert(url.to_string(), Scripted::Body(body)));
    }

    /// Answer `url` with a non-2xx `status`.
    pub fn set_status(&self, url: &str, status: u16) {
        self.with(|i| i.responses.insert(url.to_string(), Scripted::Status(status)));
    }

    /// Fail `url` below the HTTP layer.
    pub fn set_transport_error(&self, url: &str, message: &str) {
        let message = message.to_string();
        self.with(|i| i.responses.insert(url.to_string(), Scripted::Transport(message)));
    }

    /// Serve `body` once for `url` before the regular response applies.
    pub fn push_body(&self, url: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.with(|i| {
            i.queued
                .entry(url.to_string())
                .or_default()
                .push_back(Scripted::Body(body));
        });
    }

    /// Delay answers for `url`; a delay beyond the call timeout yields a timeout error.
    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.with(|i| i.delays.insert(url.to_string(), delay));
    }

    /// URLs requested so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.with(|i| i.calls.clone())
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let (scripted, delay) = self.with(|i| {
                i.calls.push(url.to_string());
                let once = i.queued.get_mut(url).and_then(VecDeque::pop_front);
                (
                    once.or_else(|| i.responses.get(url).cloned()),
                    i.delays.get(url).copied(),
                )
            });
            if let Some(delay) = delay {
                if delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(FetchError::transport(url, "request timed out"));
                }
                tokio::time::sleep(delay).await;
            }
            match scripted {
                Some(Scripted::Body(b)) => Ok(b),
                Some(Scripted::Status(code)) => Err(FetchError::http(url, code)),
                Some(Scripted::Transport(m)) => Err(FetchError::transport(url, m)),
                None => Err(FetchError::http(url, 404)),
            }
        })
    }
}
