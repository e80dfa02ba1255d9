//! Data directory layout for chatgate.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   sessions/{session_id}/   one file per credential blob
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CHATGATE_DATA_DIR";

/// Compute the credentials directory for a session: `{data_dir}/sessions/{id}/`.
pub fn session_dir(data_dir: &Path, session_id: &str) -> PathBuf {
    data_dir.join("sessions").join(session_id)
}

/// Compute the config file path: `{data_dir}/config.toml`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `CHATGATE_DATA_DIR` environment variable
/// 2. `~/.chatgate`
/// 3. `./.chatgate` when no home directory is known
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".chatgate");
    }

    PathBuf::from(".chatgate")
}
