//! capwarn binary entrypoint: logging, settings and the instance loop.

mod args;

use std::fmt;
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};

use clap::Parser;
use tracing::{error, info, warn};

use args::{Args, determine_log_level};
use capwarn::app::{DiskStore, MemoryStore, ResultStore, Scheduler, SchedulerOptions, SystemClock};
use capwarn::config::{load_settings, logs_dir};
use capwarn::sources::HttpFetcher;
use capwarn::state::{PipelineResult, Trigger};

/// Name of the single instance run by the binary.
const INSTANCE: &str = "default";

struct CapwarnTimer;

impl tracing_subscriber::fmt::time::FormatTime for CapwarnTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        // "YYYY-MM-DD-T HH:MM:SS"
        let ts = chrono::Utc::now().format("%Y-%m-%d-T %H:%M:%S").to_string();
        w.write_str(&ts)
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// What: Initialize tracing into `~/.config/capwarn/logs/capwarn.log`, or stderr on failure.
///
/// Details:
/// - `RUST_LOG` overrides the level derived from the command line.
fn init_logging(level: &str) {
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    let mut log_path = logs_dir();
    log_path.push("capwarn.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(CapwarnTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: stderr keeps stdout clean for JSON output
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(CapwarnTimer)
                .init();
            warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

/// Print one result as JSON on stdout.
fn print_result(result: &PipelineResult, compact: bool) {
    let json = if compact {
        serde_json::to_string(result)
    } else {
        serde_json::to_string_pretty(result)
    };
    match json {
        Ok(s) => println!("{s}"),
        Err(e) => error!(error = %e, "failed to serialize result"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&determine_log_level(&args));

    let mut settings = load_settings(args.config.as_deref());
    args.apply_to(&mut settings);
    let options = match SchedulerOptions::from_settings(INSTANCE, &settings) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            eprintln!("capwarn: {e}");
            return ExitCode::from(2);
        }
    };
    let store: Arc<dyn ResultStore> = if settings.persist_result {
        Arc::new(DiskStore::for_instance(INSTANCE))
    } else {
        Arc::new(MemoryStore::new())
    };
    info!(url = %settings.feed_url, once = args.once, "capwarn starting");
    let (scheduler, mut rx) = Scheduler::new(
        options,
        Arc::new(HttpFetcher::new()),
        Arc::new(SystemClock),
        store,
    );

    if args.once {
        let Some(result) = scheduler.trigger(Trigger::Manual, None).await else {
            return ExitCode::FAILURE;
        };
        print_result(&result, args.compact);
        let failed = result.meta.error.is_some() && !result.meta.stale;
        info!(count = result.count, failed, "capwarn exited");
        return if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if !settings.run_on_startup && settings.refresh_interval_secs <= 0 {
        warn!("neither startup run nor refresh interval configured; nothing will run");
    }
    scheduler.start();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            Some(result) = rx.recv() => print_result(&result, args.compact),
            _ = &mut ctrl_c => break,
        }
    }
    scheduler.stop();
    info!("capwarn exited");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    /// What: FormatTime impl writes a non-empty timestamp without panicking
    ///
    /// - Input: Tracing writer buffer
    /// - Output: Buffer receives some content
    #[test]
    fn capwarn_timer_formats_time_without_panic() {
        use tracing_subscriber::fmt::time::FormatTime;
        let mut buf = String::new();
        let mut writer = tracing_subscriber::fmt::format::Writer::new(&mut buf);
        let t = super::CapwarnTimer;
        let _ = t.format_time(&mut writer);
        assert!(buf.contains("-T "));
    }
}
