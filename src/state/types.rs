//! Core value types produced by the warning pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CAP `msgType` of an alert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    /// Initial message.
    Alert,
    /// Supersedes an earlier message.
    Update,
    /// Cancels an earlier message; dropped by the pipeline.
    Cancel,
    /// Absent or not one of the above (`Ack`, `Error`, typos).
    #[default]
    Unknown,
}

impl MsgType {
    /// What: Map a raw `msgType` string to the enum.
    ///
    /// Inputs:
    /// - `raw`: Text of the `msgType` element.
    ///
    /// Output:
    /// - Matching variant, `Unknown` when unrecognized.
    ///
    /// Details:
    /// - Case-insensitive, surrounding whitespace ignored.
    #[must_use]
    pub fn from_cap(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alert" => Self::Alert,
            "update" => Self::Update,
            "cancel" => Self::Cancel,
            _ => Self::Unknown,
        }
    }
}

/// CAP severity with its ordinal level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Severity absent or not a CAP value; level 0.
    #[default]
    Unmapped,
    /// CAP `Unknown`; level 1.
    Unknown,
    /// Level 2.
    Minor,
    /// Level 3.
    Moderate,
    /// Level 4.
    Severe,
    /// Level 5.
    Extreme,
}

impl Severity {
    /// What: Map a raw CAP severity string (case-insensitive) to the enum.
    #[must_use]
    pub fn from_cap(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unknown" => Self::Unknown,
            "minor" => Self::Minor,
            "moderate" => Self::Moderate,
            "severe" => Self::Severe,
            "extreme" => Self::Extreme,
            _ => Self::Unmapped,
        }
    }

    /// Ordinal level: `Unknown`=1 … `Extreme`=5, `Unmapped`=0.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Unmapped => 0,
            Self::Unknown => 1,
            Self::Minor => 2,
            Self::Moderate => 3,
            Self::Severe => 4,
            Self::Extreme => 5,
        }
    }
}

/// CAP `eventCode` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventCode {
    /// Code system name.
    pub value_name: String,
    /// Code value.
    pub value: String,
}

/// CAP `parameter` triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub value_name: String,
    /// Parameter value.
    pub value: String,
    /// Optional unit.
    pub unit: Option<String>,
}

/// Geocode entry that is not a warn cell id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geocode {
    /// Geocode kind as published.
    pub value_name: String,
    /// Geocode value.
    pub value: String,
}

/// A CAP `area`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    /// Free-text area description.
    pub area_desc: String,
    /// `WARNCELLID` geocode values, deduplicated, first-seen order.
    pub cell_ids: Vec<String>,
    /// All other geocodes, kept for consumers that need them.
    pub other_geocodes: Vec<Geocode>,
}

/// One CAP `info` block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfoBlock {
    /// Language tag (`de-DE`, `en-GB`, …).
    pub language: String,
    /// First `category` value.
    pub category: String,
    /// Event name.
    pub event: String,
    /// CAP urgency.
    pub urgency: String,
    /// Mapped severity.
    pub severity: Severity,
    /// CAP certainty.
    pub certainty: String,
    /// Headline.
    pub headline: String,
    /// Description.
    pub description: String,
    /// Instruction.
    pub instruction: String,
    /// Effective time.
    pub effective: Option<DateTime<Utc>>,
    /// Onset time.
    pub onset: Option<DateTime<Utc>>,
    /// Expiry time.
    pub expires: Option<DateTime<Utc>>,
    /// Human readable sender.
    pub sender_name: String,
    /// Link to more information.
    pub web: String,
    /// Contact text.
    pub contact: String,
    /// Source flagged this block as already past.
    pub past: bool,
    /// Areas in document order.
    pub areas: Vec<Area>,
    /// `eventCode` pairs.
    pub event_codes: Vec<EventCode>,
    /// `parameter` triples.
    pub parameters: Vec<Parameter>,
}

impl InfoBlock {
    /// Ordinal severity level of this block.
    #[must_use]
    pub const fn severity_level(&self) -> u8 {
        self.severity.level()
    }
}

/// Canonical warning record. Created once per run, never edited afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warning {
    /// CAP identifier (or Atom entry id); absent for some legacy feeds.
    pub identifier: Option<String>,
    /// CAP sender.
    pub sender: String,
    /// CAP `sent`.
    pub sent_at: Option<DateTime<Utc>>,
    /// Atom `updated`/`published` of the wrapping entry, when any.
    pub updated: Option<DateTime<Utc>>,
    /// CAP status (`Actual`, `Test`, …).
    pub status: String,
    /// CAP message type.
    pub msg_type: MsgType,
    /// CAP scope.
    pub scope: String,
    /// CAP `references`.
    pub references: String,
    /// CAP `note`.
    pub note: String,
    /// Where the alert came from (`zip:<member>`, `link:<url>`, …).
    pub source: String,
    /// Info blocks in document order; never empty.
    pub infos: Vec<InfoBlock>,
}

impl Warning {
    /// Highest severity level over all info blocks.
    #[must_use]
    pub fn max_severity(&self) -> u8 {
        self.infos
            .iter()
            .map(InfoBlock::severity_level)
            .max()
            .unwrap_or(0)
    }

    /// Iterator over every area of every info block.
    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.infos.iter().flat_map(|i| i.areas.iter())
    }
}

/// Which rule matched a warning to the configured region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Exact cell id hit.
    Exact,
    /// Hit on the derived parent (district) cell id.
    Parent,
    /// Area description contains a configured name token.
    Name,
}

/// Number of candidate warnings per match tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    /// Exact-id matches.
    pub exact: usize,
    /// Parent-id matches.
    pub parent: usize,
    /// Name matches.
    pub name: usize,
}

impl TierCounts {
    /// Increment the counter for `tier`.
    pub const fn bump(&mut self, tier: MatchTier) {
        match tier {
            MatchTier::Exact => self.exact += 1,
            MatchTier::Parent => self.parent += 1,
            MatchTier::Name => self.name += 1,
        }
    }
}

/// What started a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// External one-shot trigger.
    #[default]
    Manual,
    /// Periodic timer tick.
    Timer,
    /// Run-once-at-startup trigger.
    Startup,
}

/// Effective filter configuration echoed into every result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    /// Configured cell id, if any.
    pub region_id: Option<String>,
    /// Derived parent id when parent matching is on.
    pub parent_id: Option<String>,
    /// Whether area-name fallback was enabled.
    pub name_fallback: bool,
    /// Lowercase area-name tokens.
    pub area_names: Vec<String>,
    /// Whether the active-or-future filter was applied.
    pub only_active_future: bool,
    /// Whether stale delivery was permitted.
    pub allow_stale: bool,
}

impl FilterSummary {
    /// What: `true` when both summaries select the same region.
    ///
    /// Details:
    /// - Compares region id, parent id, name fallback and area names; the
    ///   temporal and stale flags do not change which region a result is for.
    #[must_use]
    pub fn same_region(&self, other: &Self) -> bool {
        self.region_id == other.region_id
            && self.parent_id == other.parent_id
            && self.name_fallback == other.name_fallback
            && self.area_names == other.area_names
    }
}

/// Metadata block of a [`PipelineResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    /// Every URL fetched successfully during the run.
    pub sources: Vec<String>,
    /// When the warning sequence was computed.
    pub computed_at: DateTime<Utc>,
    /// When this message was emitted (differs from `computed_at` for stale results).
    pub delivered_at: DateTime<Utc>,
    /// Warning sequence was not recomputed in this run.
    pub stale: bool,
    /// Run-level error of the emitting run.
    pub error: Option<String>,
    /// What started the emitting run.
    pub trigger: Trigger,
    /// Filter configuration used.
    pub filter: FilterSummary,
    /// Tier of the authoritative warnings.
    pub match_tier: Option<MatchTier>,
    /// Candidate counts per tier.
    pub tier_counts: TierCounts,
    /// Per-entry failures that were skipped.
    pub entry_errors: Vec<String>,
    /// Payload came from the directory-index fallback rather than the primary URL.
    pub from_index_fallback: bool,
}

/// Output of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Number of warnings.
    pub count: usize,
    /// Distinct event names, `", "`-joined.
    pub events: String,
    /// Highest severity level over `warnings`.
    pub max_severity: u8,
    /// Matched warnings, post-filter and post-dedup.
    pub warnings: Vec<Warning>,
    /// Run metadata.
    pub meta: ResultMeta,
}

impl PipelineResult {
    /// What: Build the explicit empty result emitted when a run fails without a usable cache.
    ///
    /// Inputs:
    /// - `error`: Run-level error text.
    /// - `meta_base`: Metadata skeleton of the failed run.
    ///
    /// Output:
    /// - Result with count 0, no warnings, `stale=false` and the error recorded.
    #[must_use]
    pub fn failed(error: String, mut meta_base: ResultMeta) -> Self {
        meta_base.stale = false;
        meta_base.error = Some(error);
        meta_base.match_tier = None;
        meta_base.tier_counts = TierCounts::default();
        Self {
            count: 0,
            events: String::new(),
            max_severity: 0,
            warnings: Vec::new(),
            meta: meta_base,
        }
    }

    /// What: Re-deliver a cached result after a failed run.
    ///
    /// Inputs:
    /// - `error`: Error of the failed run.
    /// - `trigger`: Trigger of the failed run.
    /// - `now`: Delivery instant.
    ///
    /// Output:
    /// - Copy with identical warnings and `stale=true`; `computed_at` keeps the original instant.
    #[must_use]
    pub fn as_stale(&self, error: String, trigger: Trigger, now: DateTime<Utc>) -> Self {
        let mut out = self.clone();
        out.meta.stale = true;
        out.meta.error = Some(error);
        out.meta.trigger = trigger;
        out.meta.delivered_at = now;
        out
    }
}
