//! One pipeline run: fetch, unpack, parse, follow links, normalize, filter.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::config::Settings;
use crate::error::{ConfigurationError, PipelineError};
use crate::logic::{RegionFilter, classify, dedupe, warning_is_current};
use crate::sources::{
    EntryBody, EntryContext, Fetcher, IndexSource, ParsedDocument, XmlNode, extract,
    fetch_with_fallback, is_zip, normalize_entry, parse,
};
use crate::state::{MatchTier, MsgType, PipelineResult, ResultMeta, TierCounts, Trigger, Warning};

/// Effective configuration of one instance's runs.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Primary feed URL.
    pub feed_url: String,
    /// Directory-index fallback for a 404 on `feed_url`.
    pub index: Option<IndexSource>,
    /// Region filter.
    pub filter: RegionFilter,
    /// Apply the active-or-future filter.
    pub only_active_future: bool,
    /// Echoed into metadata; consulted by the scheduler.
    pub allow_stale: bool,
    /// Per-call network timeout.
    pub timeout: Duration,
    /// Concurrent link-follow fetches.
    pub link_concurrency: usize,
}

impl PipelineConfig {
    /// What: Validate settings into a run configuration.
    ///
    /// # Errors
    /// - `ConfigurationError` for an invalid region filter or index pattern.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            feed_url: settings.feed_url.clone(),
            index: settings.index_source()?,
            filter: RegionFilter::from_settings(settings)?,
            only_active_future: settings.only_active_future,
            allow_stale: settings.allow_stale,
            timeout: Duration::from_millis(settings.timeout_ms),
            link_concurrency: settings.link_concurrency.max(1),
        })
    }

    /// What: Metadata skeleton for a run started now by `trigger`.
    #[must_use]
    pub fn meta_base(&self, trigger: Trigger, now: chrono::DateTime<chrono::Utc>) -> ResultMeta {
        ResultMeta {
            sources: Vec::new(),
            computed_at: now,
            delivered_at: now,
            stale: false,
            error: None,
            trigger,
            filter: self.filter.summary(self.only_active_future, self.allow_stale),
            match_tier: None,
            tier_counts: TierCounts::default(),
            entry_errors: Vec::new(),
            from_index_fallback: false,
        }
    }
}

/// Atom entry fields carried alongside an alert until normalization.
#[derive(Clone, Debug, Default)]
struct EntryFields {
    /// Entry id.
    id: Option<String>,
    /// Entry title.
    title: Option<String>,
    /// Entry updated/published.
    updated: Option<String>,
}

impl EntryFields {
    /// Borrow as normalization context.
    fn context(&self) -> EntryContext<'_> {
        EntryContext {
            id: self.id.as_deref(),
            title: self.title.as_deref(),
            updated: self.updated.as_deref(),
        }
    }
}

/// An alert ready to normalize, or a link still to fetch.
#[derive(Debug)]
enum Pending {
    /// Alert tree with its source label.
    Alert {
        /// Source label.
        source: String,
        /// Alert tree.
        node: XmlNode,
        /// Entry context.
        fields: EntryFields,
    },
    /// Link-only Atom entry.
    Link {
        /// Linked document.
        url: String,
        /// Entry context.
        fields: EntryFields,
    },
}

/// Alerts resolved for one pending item.
type Resolved = Vec<(String, XmlNode, EntryFields)>;

/// Per-run bookkeeping.
#[derive(Default)]
struct RunLog {
    /// URLs fetched successfully.
    sources: Vec<String>,
    /// Per-entry failures.
    entry_errors: Vec<String>,
}

impl RunLog {
    /// Record and log a skipped entry.
    fn skip(&mut self, entry: &str, reason: impl std::fmt::Display) {
        warn!(entry, reason = %reason, "skipping entry");
        self.entry_errors.push(format!("{entry}: {reason}"));
    }
}

/// What: Split a parsed document into pending alerts and links.
fn collect_pending(document: ParsedDocument, source: &str, log: &mut RunLog, out: &mut Vec<Pending>) {
    match document {
        ParsedDocument::Alert(node) => out.push(Pending::Alert {
            source: source.to_string(),
            node,
            fields: EntryFields::default(),
        }),
        ParsedDocument::Feed(entries) => {
            for (i, entry) in entries.into_iter().enumerate() {
                let fields = EntryFields {
                    id: entry.id,
                    title: entry.title,
                    updated: entry.updated,
                };
                match entry.body {
                    EntryBody::Inline(node) => out.push(Pending::Alert {
                        source: format!("{source}#{}", i + 1),
                        node,
                        fields,
                    }),
                    EntryBody::Link(url) => out.push(Pending::Link { url, fields }),
                    EntryBody::Empty => {
                        debug!(source, entry = i + 1, "feed entry without alert or link");
                    }
                }
            }
        }
        ParsedDocument::Other(root) => {
            log.skip(source, format!("no alert in document with root <{root}>"));
        }
    }
}

/// What: Fetch and parse one linked document.
///
/// Output:
/// - Alerts found in it, or a reason for skipping the entry.
///
/// Details:
/// - Links inside the linked document are not followed again.
async fn follow_link(
    fetcher: &dyn Fetcher,
    url: &str,
    fields: EntryFields,
    timeout: Duration,
) -> Result<Resolved, String> {
    let bytes = fetcher.fetch(url, timeout).await.map_err(|e| e.to_string())?;
    let text = String::from_utf8_lossy(&bytes);
    let parsed = parse(&text).map_err(|e| e.to_string())?;
    let source = format!("link:{url}");
    match parsed.document {
        ParsedDocument::Alert(node) => Ok(vec![(source, node, fields)]),
        ParsedDocument::Feed(entries) => Ok(entries
            .into_iter()
            .filter_map(|e| match e.body {
                EntryBody::Inline(node) => Some((source.clone(), node, fields.clone())),
                _ => None,
            })
            .collect()),
        ParsedDocument::Other(root) => Err(format!("no alert in document with root <{root}>")),
    }
}

/// What: Resolve every pending item, following links concurrently.
///
/// Details:
/// - At most `concurrency` fetches are in flight. All items are joined before
///   returning and the output keeps the original entry order.
async fn resolve(
    fetcher: &dyn Fetcher,
    pending: Vec<Pending>,
    timeout: Duration,
    concurrency: usize,
    log: &mut RunLog,
) -> Resolved {
    let mut results: Vec<(usize, Option<String>, Result<Resolved, String>)> = stream::iter(
        pending.into_iter().enumerate(),
    )
    .map(|(i, item)| async move {
        match item {
            Pending::Alert {
                source,
                node,
                fields,
            } => (i, None, Ok(vec![(source, node, fields)])),
            Pending::Link { url, fields } => {
                let res = follow_link(fetcher, &url, fields, timeout).await;
                (i, Some(url), res)
            }
        }
    })
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;
    results.sort_by_key(|(i, _, _)| *i);

    let mut out = Vec::new();
    for (_, url, res) in results {
        match (url, res) {
            (Some(url), Ok(alerts)) => {
                log.sources.push(url);
                out.extend(alerts);
            }
            (Some(url), Err(reason)) => log.skip(&format!("link:{url}"), reason),
            (None, Ok(alerts)) => out.extend(alerts),
            (None, Err(reason)) => log.skip("inline", reason),
        }
    }
    out
}

/// What: Join distinct non-empty event names in first-seen order.
fn event_summary(warnings: &[Warning]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for info in warnings.iter().flat_map(|w| w.infos.iter()) {
        let ev = info.event.trim();
        if !ev.is_empty() && !names.contains(&ev) {
            names.push(ev);
        }
    }
    names.join(", ")
}

/// What: Filter normalized warnings and assemble the result.
///
/// Inputs:
/// - `warnings`: Normalized warnings in entry order.
/// - `config`: Run configuration.
/// - `now`: Reference instant for the temporal filter.
/// - `meta`: Metadata of the run, completed here.
///
/// Output:
/// - Result holding only the most specific tier's warnings.
///
/// Details:
/// - `msgType=Cancel` is always dropped; the temporal filter only applies
///   with `only_active_future`.
/// - Severity is computed over the final set.
#[must_use]
pub fn assemble(
    warnings: Vec<Warning>,
    config: &PipelineConfig,
    now: chrono::DateTime<chrono::Utc>,
    mut meta: ResultMeta,
) -> PipelineResult {
    let total = warnings.len();
    let candidates: Vec<Warning> = warnings
        .into_iter()
        .filter(|w| w.msg_type != MsgType::Cancel)
        .filter(|w| classify(w, &config.filter).is_some())
        .filter(|w| !config.only_active_future || warning_is_current(w, now))
        .collect();
    let candidates = dedupe(candidates);

    let mut counts = TierCounts::default();
    let tiered: Vec<(MatchTier, Warning)> = candidates
        .into_iter()
        .filter_map(|w| classify(&w, &config.filter).map(|t| (t, w)))
        .inspect(|(t, _)| counts.bump(*t))
        .collect();
    let best = tiered.iter().map(|(t, _)| *t).min();
    let selected: Vec<Warning> = tiered
        .into_iter()
        .filter(|(t, _)| Some(*t) == best)
        .map(|(_, w)| w)
        .collect();

    info!(
        total,
        matched = selected.len(),
        exact = counts.exact,
        parent = counts.parent,
        name = counts.name,
        "[Pipeline] filtered warnings"
    );
    meta.match_tier = best;
    meta.tier_counts = counts;
    PipelineResult {
        count: selected.len(),
        events: event_summary(&selected),
        max_severity: selected.iter().map(Warning::max_severity).max().unwrap_or(0),
        warnings: selected,
        meta,
    }
}

/// What: Execute one run end to end.
///
/// Inputs:
/// - `fetcher`: Network capability.
/// - `clock`: Time capability.
/// - `config`: Run configuration.
/// - `url`: Primary URL (the configured feed or a per-run override).
/// - `trigger`: What started the run.
///
/// Output:
/// - Fresh `PipelineResult` with `stale=false`.
///
/// # Errors
/// - `PipelineError::Fetch` when the primary source cannot be fetched.
/// - `PipelineError::Archive` when the primary payload is a corrupt ZIP.
/// - `PipelineError::Parse` when a non-archive primary document does not parse.
///
/// Details:
/// - Archive members, linked documents and single alerts that fail are
///   skipped and listed in `meta.entry_errors`.
pub async fn run_pipeline(
    fetcher: &dyn Fetcher,
    clock: &dyn Clock,
    config: &PipelineConfig,
    url: &str,
    trigger: Trigger,
) -> Result<PipelineResult, PipelineError> {
    let mut meta = config.meta_base(trigger, clock.now());
    let mut log = RunLog::default();

    let fetched = fetch_with_fallback(fetcher, url, config.index.as_ref(), config.timeout).await?;
    meta.from_index_fallback = fetched.stale;
    log.sources.push(fetched.url.clone());

    let mut pending: Vec<Pending> = Vec::new();
    if is_zip(&fetched.bytes) {
        let contents = extract(&fetched.bytes)?;
        info!(
            url = %fetched.url,
            members = contents.payloads.len(),
            skipped = contents.skipped.len(),
            "[Pipeline] unpacked archive"
        );
        for s in contents.skipped {
            log.skip(&format!("zip:{}", s.name), s.reason);
        }
        for payload in contents.payloads {
            let label = format!("zip:{}", payload.name);
            match parse(&payload.xml) {
                Ok(parsed) => collect_pending(parsed.document, &label, &mut log, &mut pending),
                Err(e) => log.skip(&label, e),
            }
        }
    } else {
        let text = String::from_utf8_lossy(&fetched.bytes);
        let parsed = parse(&text)?;
        collect_pending(parsed.document, &fetched.url, &mut log, &mut pending);
    }

    let links = pending.iter().filter(|p| matches!(p, Pending::Link { .. })).count();
    if links > 0 {
        debug!(links, concurrency = config.link_concurrency, "following entry links");
    }
    let alerts = resolve(fetcher, pending, config.timeout, config.link_concurrency, &mut log).await;

    let mut warnings: Vec<Warning> = Vec::with_capacity(alerts.len());
    for (source, node, fields) in &alerts {
        match normalize_entry(node, source, &fields.context()) {
            Ok(Some(w)) => warnings.push(w),
            Ok(None) => debug!(source = %source, "no alert element, skipped"),
            Err(e) => log.skip(source, e),
        }
    }

    meta.sources = log.sources;
    meta.entry_errors = log.entry_errors;
    let now = clock.now();
    meta.computed_at = now;
    meta.delivered_at = now;
    Ok(assemble(warnings, config, now, meta))
}
