//! Persisted "last good result" slot.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::state::PipelineResult;

/// Storage for the most recent non-stale result of an instance.
pub trait ResultStore: Send + Sync {
    /// Last saved result, if any.
    fn load(&self) -> Option<PipelineResult>;
    /// Replace the saved result. Failures are logged, never propagated.
    fn save(&self, result: &PipelineResult);
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Saved result.
    slot: Mutex<Option<PipelineResult>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn load(&self) -> Option<PipelineResult> {
        match self.slot.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save(&self, result: &PipelineResult) {
        match self.slot.lock() {
            Ok(mut g) => *g = Some(result.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(result.clone()),
        }
    }
}

/// On-disk record with the save time (Unix seconds).
#[derive(Serialize, Deserialize, Debug)]
struct DiskResultEntry {
    /// Saved result.
    result: PipelineResult,
    /// Unix timestamp of the save.
    saved_at: i64,
}

/// JSON file store.
#[derive(Clone, Debug)]
pub struct DiskStore {
    /// File holding a [`DiskResultEntry`].
    path: PathBuf,
}

impl DiskStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// What: Default store for an instance under the state directory.
    ///
    /// Inputs:
    /// - `instance`: Instance name; characters outside `[A-Za-z0-9_-]` become `_`.
    #[must_use]
    pub fn for_instance(instance: &str) -> Self {
        let safe: String = instance
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Self::new(crate::config::state_dir().join(format!("{safe}_last_result.json")))
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for DiskStore {
    fn load(&self) -> Option<PipelineResult> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<DiskResultEntry>(&content) {
            Ok(entry) => {
                info!(
                    path = %self.path.display(),
                    count = entry.result.count,
                    saved_at = entry.saved_at,
                    "[Persist] loaded last result"
                );
                Some(entry.result)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "[Persist] ignoring corrupt result file");
                None
            }
        }
    }

    fn save(&self, result: &PipelineResult) {
        let entry = DiskResultEntry {
            result: result.clone(),
            saved_at: chrono::Utc::now().timestamp(),
        };
        if let Some(dir) = self.path.parent()
            && let Err(e) = fs::create_dir_all(dir)
        {
            debug!(dir = %dir.display(), error = %e, "[Persist] failed to create state directory");
        }
        match serde_json::to_string_pretty(&entry) {
            Ok(json) => match fs::write(&self.path, json) {
                Ok(()) => debug!(path = %self.path.display(), count = result.count, "[Persist] result saved"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "[Persist] failed to write result"),
            },
            Err(e) => warn!(error = %e, "[Persist] failed to serialize result"),
        }
    }
}
