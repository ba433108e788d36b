//! Value types shared by the pipeline, the scheduler and the CLI.
//!
//! Everything here is plain data with `serde` derives; results are persisted
//! and printed as JSON.

pub mod types;

pub use types::{
    Area, EventCode, FilterSummary, Geocode, InfoBlock, MatchTier, MsgType, Parameter,
    PipelineResult, ResultMeta, Severity, TierCounts, Trigger, Warning,
};
