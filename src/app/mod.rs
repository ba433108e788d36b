//! Run orchestration: the pipeline, its instance scheduler and their capabilities.

/// Wall-clock capability.
pub mod clock;
/// Persisted last good result.
pub mod persist;
pub mod pipeline;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use persist::{DiskStore, MemoryStore, ResultStore};
pub use pipeline::{PipelineConfig, assemble, run_pipeline};
pub use scheduler::{Phase, Scheduler, SchedulerOptions};
