//! XDG Base Directory paths for nudge.
//!
//! The CLI keeps its config and cached client state under XDG paths on every
//! platform rather than platform-native locations.

use std::path::{Path, PathBuf};

const APP: &str = "nudge";

/// Get the nudge config directory.
///
/// Returns `$XDG_CONFIG_HOME/nudge` if set, otherwise `~/.config/nudge`.
///
/// # Examples
///
/// ```
/// use nudge_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".config",
    )
}

/// Get the nudge data directory.
///
/// Returns `$XDG_DATA_HOME/nudge` if set, otherwise `~/.local/share/nudge`.
/// Persisted client state snapshots live here.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".local/share",
    )
}

/// Default location of the persisted client state
pub fn state_file() -> PathBuf {
    data_dir().join("state.json")
}

fn resolve(xdg: Option<PathBuf>, home: Option<PathBuf>, home_relative: &str) -> PathBuf {
    let base = match (xdg, home) {
        (Some(xdg), _) if !xdg.as_os_str().is_empty() => xdg,
        (_, Some(home)) => home.join(home_relative),
        _ => Path::new(home_relative).to_path_buf(),
    };
    base.join(APP)
}
