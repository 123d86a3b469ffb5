pub mod config;
pub mod database;
pub mod migrations;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Overrides the data directory entirely.
pub const HOME_ENV: &str = "HABITLOOP_HOME";
/// `dev` selects `~/.config/habitloop-dev`.
pub const ENV_ENV: &str = "HABITLOOP_ENV";

/// Returns `$HABITLOOP_HOME`, else `~/.config/habitloop[-dev]/` based on HABITLOOP_ENV.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var(ENV_ENV).unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitloop-dev")
            } else {
                base_dir.join("habitloop")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
