//! Filesystem layout under the carafe home directory.

use carafe_schema::AppName;
use dirs::home_dir;
use std::path::PathBuf;

/// Returns the primary configuration directory, or None if the user's home
/// cannot be resolved.
pub fn try_carafe_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("CARAFE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".carafe"))
}

/// Returns the canonical carafe home directory (`~/.carafe`).
///
/// # Panics
///
/// Panics if neither `CARAFE_HOME` is set nor the user's home directory can
/// be resolved.
pub fn carafe_home() -> PathBuf {
    try_carafe_home().expect("Could not determine home directory. Set CARAFE_HOME to override.")
}

/// Entry-point symlink target: ~/.carafe/bin
pub fn bin_path() -> PathBuf {
    carafe_home().join("bin")
}

/// Environment store: ~/.carafe/envs
pub fn envs_path() -> PathBuf {
    carafe_home().join("envs")
}

/// One application's environment: ~/.carafe/envs/<name>
pub fn env_path(name: &AppName) -> PathBuf {
    envs_path().join(name)
}

/// Install lock for one environment: ~/.carafe/envs/<name>.lock
pub fn lock_path(name: &AppName) -> PathBuf {
    envs_path().join(format!("{name}.lock"))
}

/// Archive cache, keyed by digest: ~/.carafe/cache
pub fn cache_path() -> PathBuf {
    carafe_home().join("cache")
}

/// Logs directory: ~/.carafe/logs
pub fn log_dir() -> PathBuf {
    carafe_home().join("logs")
}

/// Temp path: ~/.carafe/tmp (guaranteed same volume as envs, so staged
/// environments can be renamed into place)
pub fn tmp_path() -> PathBuf {
    carafe_home().join("tmp")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
