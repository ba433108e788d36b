//! Per-instance run state, stale-result cache and refresh timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::persist::ResultStore;
use super::pipeline::{PipelineConfig, run_pipeline};
use crate::config::Settings;
use crate::error::ConfigurationError;
use crate::sources::Fetcher;
use crate::state::{PipelineResult, Trigger};

/// Upper bound of the random delay before the startup run.
const STARTUP_JITTER_MS: u64 = 200;

/// Observable run phase of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No run in flight.
    Idle,
    /// A run is fetching or processing.
    Fetching,
    /// Last run succeeded; emitting.
    Succeeded,
    /// Last run failed; emitting stale or empty result.
    Failed,
}

/// Instance configuration beyond the pipeline itself.
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    /// Instance name used in logs and the persisted result file.
    pub name: String,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Timer period; `<= 0` disables the timer.
    pub refresh_interval_secs: i64,
    /// Run once when started.
    pub run_on_startup: bool,
    /// Delay before the single retry after a parse failure.
    pub retry_delay: Duration,
}

impl SchedulerOptions {
    /// What: Build options from settings.
    ///
    /// # Errors
    /// - `ConfigurationError` when the region filter or index pattern is invalid.
    pub fn from_settings(name: &str, settings: &Settings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            name: name.to_string(),
            pipeline: PipelineConfig::from_settings(settings)?,
            refresh_interval_secs: settings.refresh_interval_secs,
            run_on_startup: settings.run_on_startup,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }
}

/// State shared between the handle, the timer task and spawned runs.
struct Shared {
    /// Options.
    options: SchedulerOptions,
    /// Network capability.
    fetcher: Arc<dyn Fetcher>,
    /// Time capability.
    clock: Arc<dyn Clock>,
    /// Persisted last good result.
    store: Arc<dyn ResultStore>,
    /// Set while a run is in flight.
    busy: AtomicBool,
    /// Current phase.
    phase: Mutex<Phase>,
    /// Last non-stale result; replaced whole, never edited.
    cache: Mutex<Option<Arc<PipelineResult>>>,
    /// Emission channel.
    tx: mpsc::UnboundedSender<PipelineResult>,
}

/// Lock a mutex, recovering from poisoning.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Shared {
    /// Move to `phase`.
    fn set_phase(&self, phase: Phase) {
        debug!(instance = %self.options.name, ?phase, "[Scheduler] phase");
        *lock(&self.phase) = phase;
    }
}

/// Holds the busy flag; clearing it and returning to `Idle` on drop, also
/// when the run future is dropped mid-flight.
struct BusyGuard<'a> {
    /// Owning state.
    shared: &'a Shared,
}

impl<'a> BusyGuard<'a> {
    /// Take the busy flag, or `None` when a run is already in flight.
    fn acquire(shared: &'a Shared) -> Option<Self> {
        shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { shared })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.shared.phase) = Phase::Idle;
        self.shared.busy.store(false, Ordering::Release);
    }
}

/// What: Perform one guarded run and emit its outcome.
///
/// Output:
/// - Emitted result, or `None` when dropped because a run was in flight.
async fn run_once(shared: &Shared, trigger: Trigger, url_override: Option<&str>) -> Option<PipelineResult> {
    let Some(_guard) = BusyGuard::acquire(shared) else {
        info!(instance = %shared.options.name, ?trigger, "[Scheduler] run in flight, dropping trigger");
        return None;
    };
    shared.set_phase(Phase::Fetching);
    let config = &shared.options.pipeline;
    let url = url_override.unwrap_or(&config.feed_url);

    let mut outcome = run_pipeline(shared.fetcher.as_ref(), shared.clock.as_ref(), config, url, trigger).await;
    if let Err(e) = &outcome
        && e.is_parse()
    {
        warn!(
            instance = %shared.options.name,
            error = %e,
            delay = ?shared.options.retry_delay,
            "[Scheduler] parse failed, retrying once"
        );
        sleep(shared.options.retry_delay).await;
        outcome = run_pipeline(shared.fetcher.as_ref(), shared.clock.as_ref(), config, url, trigger).await;
    }

    let result = match outcome {
        Ok(result) => {
            shared.set_phase(Phase::Succeeded);
            info!(
                instance = %shared.options.name,
                count = result.count,
                events = %result.events,
                "[Scheduler] run succeeded"
            );
            *lock(&shared.cache) = Some(Arc::new(result.clone()));
            shared.store.save(&result);
            result
        }
        Err(e) => {
            shared.set_phase(Phase::Failed);
            let message = e.to_string();
            let now = shared.clock.now();
            let cached = lock(&shared.cache).clone();
            match cached {
                Some(prev) if config.allow_stale => {
                    warn!(instance = %shared.options.name, error = %message, "[Scheduler] run failed, delivering stale result");
                    prev.as_stale(message, trigger, now)
                }
                _ => {
                    warn!(instance = %shared.options.name, error = %message, "[Scheduler] run failed, delivering empty result");
                    PipelineResult::failed(message, config.meta_base(trigger, now))
                }
            }
        }
    };
    if shared.tx.send(result.clone()).is_err() {
        debug!(instance = %shared.options.name, "[Scheduler] receiver gone, result discarded");
    }
    Some(result)
}

/// One configured pipeline instance.
pub struct Scheduler {
    /// Shared state.
    shared: Arc<Shared>,
    /// Timer task while started.
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// What: Create an instance and its result channel.
    ///
    /// Inputs:
    /// - `options`: Instance options.
    /// - `fetcher`, `clock`, `store`: Capabilities.
    ///
    /// Output:
    /// - The instance and the receiver of every emitted result.
    ///
    /// Details:
    /// - The cache is seeded from `store`, so stale delivery works right after a restart.
    /// - A stored result computed for a different region filter is not seeded.
    #[must_use]
    pub fn new(
        options: SchedulerOptions,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn ResultStore>,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = &options.pipeline;
        let current = pipeline
            .filter
            .summary(pipeline.only_active_future, pipeline.allow_stale);
        let seeded = store
            .load()
            .filter(|prev| {
                let same = prev.meta.filter.same_region(&current);
                if !same {
                    debug!(
                        instance = %options.name,
                        stored = ?prev.meta.filter.region_id,
                        configured = ?current.region_id,
                        "[Scheduler] stored result is for another region, not seeding cache"
                    );
                }
                same
            })
            .map(Arc::new);
        if seeded.is_some() {
            debug!(instance = %options.name, "[Scheduler] cache seeded from store");
        }
        let shared = Arc::new(Shared {
            options,
            fetcher,
            clock,
            store,
            busy: AtomicBool::new(false),
            phase: Mutex::new(Phase::Idle),
            cache: Mutex::new(seeded),
            tx,
        });
        (
            Self {
                shared,
                timer: Mutex::new(None),
            },
            rx,
        )
    }

    /// What: Run now unless a run is already in flight.
    ///
    /// Inputs:
    /// - `trigger`: Recorded in the result metadata.
    /// - `url_override`: Primary URL for this run only.
    ///
    /// Output:
    /// - The emitted result, or `None` when the trigger was dropped.
    pub async fn trigger(&self, trigger: Trigger, url_override: Option<&str>) -> Option<PipelineResult> {
        run_once(&self.shared, trigger, url_override).await
    }

    /// What: Start the startup run and the refresh timer.
    ///
    /// Details:
    /// - The startup run waits a random 0–200 ms first.
    /// - Each tick spawns its own run; ticks landing on a busy instance are dropped.
    /// - Calling `start` on a started instance does nothing.
    pub fn start(&self) {
        let mut slot = lock(&self.timer);
        if slot.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let period = u64::try_from(shared.options.refresh_interval_secs)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        info!(
            instance = %shared.options.name,
            interval_secs = shared.options.refresh_interval_secs,
            startup = shared.options.run_on_startup,
            "[Scheduler] starting"
        );
        *slot = Some(tokio::spawn(async move {
            if shared.options.run_on_startup {
                let jitter = rand::rng().random_range(0..=STARTUP_JITTER_MS);
                sleep(Duration::from_millis(jitter)).await;
                let s = Arc::clone(&shared);
                tokio::spawn(async move {
                    run_once(&s, Trigger::Startup, None).await;
                });
            }
            let Some(period) = period else {
                return;
            };
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let s = Arc::clone(&shared);
                tokio::spawn(async move {
                    run_once(&s, Trigger::Timer, None).await;
                });
            }
        }));
    }

    /// What: Cancel the timer. In-flight runs finish on their own.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
            info!(instance = %self.shared.options.name, "[Scheduler] stopped");
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        *lock(&self.shared.phase)
    }

    /// `true` while a run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Last non-stale result.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<PipelineResult>> {
        lock(&self.shared.cache).clone()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
