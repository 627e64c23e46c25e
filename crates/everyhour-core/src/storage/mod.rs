mod config;
pub mod database;
pub mod records;

pub use config::{Config, DaemonConfig, NotificationsConfig, SchedulerConfig};
pub use database::Database;
pub use records::{CURRENT_TASK_KEY, HISTORY_KEY, SETTINGS_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `EVERYHOUR_DATA_DIR` wins when set. Otherwise `~/.config/everyhour[-dev]/`
/// based on `EVERYHOUR_ENV` (set `EVERYHOUR_ENV=dev` for the development
/// directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("EVERYHOUR_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("EVERYHOUR_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("everyhour-dev")
            } else {
                base_dir.join("everyhour")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
