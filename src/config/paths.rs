use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the config base.
const APP_DIR: &str = "capwarn";
/// Settings file name.
const CONFIG_FILE: &str = "capwarn.conf";

/// What: Find an existing settings file.
///
/// Output:
/// - First existing of `$XDG_CONFIG_HOME/capwarn/capwarn.conf` and
///   `$HOME/.config/capwarn/capwarn.conf`.
#[must_use]
pub fn resolve_config_path() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME")
        && !xdg.trim().is_empty()
    {
        candidates.push(Path::new(&xdg).join(APP_DIR).join(CONFIG_FILE));
    }
    if let Ok(home) = env::var("HOME") {
        candidates.push(Path::new(&home).join(".config").join(APP_DIR).join(CONFIG_FILE));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Resolve an XDG base directory from `var`, else `$HOME` joined with `home_default`.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let mut base = PathBuf::from(home);
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// Config directory `$XDG_CONFIG_HOME/capwarn` (or `$HOME/.config/capwarn`), ensured to exist.
#[must_use]
pub fn config_dir() -> PathBuf {
    let dir = xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join(APP_DIR);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Logs directory under config (ensured to exist).
#[must_use]
pub fn logs_dir() -> PathBuf {
    let dir = config_dir().join("logs");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// State directory under config holding persisted results (ensured to exist).
#[must_use]
pub fn state_dir() -> PathBuf {
    let dir = config_dir().join("state");
    let _ = std::fs::create_dir_all(&dir);
    dir
}
