//! Command-line argument definition and settings overrides.

use std::path::PathBuf;

use clap::Parser;
use capwarn::config::Settings;

/// capwarn - Region-filtered CAP weather warnings
#[derive(Parser, Debug, Default)]
#[command(name = "capwarn")]
#[command(version)]
#[command(about = "Fetch, filter and print CAP weather warnings for one region", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Warn cell id of the region (9 digits, e.g. 805362004)
    #[arg(long, value_name = "ID")]
    pub region: Option<String>,

    /// Area-name token matched against area descriptions (repeatable, implies --name-fallback)
    #[arg(long = "area-name", value_name = "NAME")]
    pub area_names: Vec<String>,

    /// Match area descriptions against the area-name tokens
    #[arg(long)]
    pub name_fallback: bool,

    /// Also match the district containing the region
    #[arg(long)]
    pub match_parent: bool,

    /// Keep warnings that already ended
    #[arg(long)]
    pub all: bool,

    /// Emit an empty result instead of the last good one when a run fails
    #[arg(long)]
    pub no_stale: bool,

    /// Refresh interval in seconds (0 or less disables the timer)
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Network timeout per request in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Feed URL to fetch instead of the configured one
    #[arg(long)]
    pub url: Option<String>,

    /// Run once, print the result and exit
    #[arg(long)]
    pub once: bool,

    /// Settings file (default: ~/.config/capwarn/capwarn.conf)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Print results as single-line JSON
    #[arg(long)]
    pub compact: bool,
}

impl Args {
    /// What: Apply command-line overrides on top of file settings.
    ///
    /// Inputs:
    /// - `settings`: Settings loaded from the config file.
    ///
    /// Details:
    /// - Flags only ever switch features on or off relative to the file; absent
    ///   options leave file values untouched.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(region) = &self.region {
            settings.region_id = Some(region.clone());
        }
        if !self.area_names.is_empty() {
            settings.area_names.clone_from(&self.area_names);
            settings.name_fallback = true;
        }
        if self.name_fallback {
            settings.name_fallback = true;
        }
        if self.match_parent {
            settings.match_parent = true;
        }
        if self.all {
            settings.only_active_future = false;
        }
        if self.no_stale {
            settings.allow_stale = false;
        }
        if let Some(secs) = self.interval {
            settings.refresh_interval_secs = secs;
        }
        if let Some(ms) = self.timeout_ms.filter(|ms| *ms > 0) {
            settings.timeout_ms = ms;
        }
        if let Some(url) = &self.url {
            settings.feed_url.clone_from(url);
        }
        if self.once {
            settings.run_on_startup = false;
            settings.refresh_interval_secs = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Flags override the matching settings and leave the rest alone.
    ///
    /// Inputs:
    /// - Command line with region, two area names, `--all`, `--no-stale`, a negative interval.
    ///
    /// Output:
    /// - Overridden fields changed; timeout and URL keep their file values.
    fn overrides_apply_on_top_of_settings() {
        let args = Args::parse_from([
            "capwarn",
            "--region",
            "805362004",
            "--area-name",
            "Musterhausen",
            "--area-name",
            "Altstadt",
            "--all",
            "--no-stale",
            "--interval",
            "-1",
        ]);
        let mut s = Settings::default();
        args.apply_to(&mut s);
        assert_eq!(s.region_id.as_deref(), Some("805362004"));
        assert_eq!(s.area_names.len(), 2);
        assert!(s.name_fallback);
        assert!(!s.only_active_future);
        assert!(!s.allow_stale);
        assert_eq!(s.refresh_interval_secs, -1);
        assert_eq!(s.timeout_ms, Settings::default().timeout_ms);
        assert_eq!(s.feed_url, Settings::default().feed_url);
    }

    #[test]
    fn once_disables_scheduling() {
        let args = Args::parse_from(["capwarn", "--once", "--url", "http://x/feed"]);
        let mut s = Settings::default();
        args.apply_to(&mut s);
        assert!(!s.run_on_startup);
        assert_eq!(s.refresh_interval_secs, 0);
        assert_eq!(s.feed_url, "http://x/feed");
    }
}
