mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{Config, LogConfig, ServiceConfig, StorageConfig, SummaryConfig};
pub use database::HabitDb;
pub use store::HabitStore;

use std::path::PathBuf;

/// Returns the data directory.
///
/// `FITHABIT_DATA_DIR` wins if set. Otherwise `~/.config/fithabit[-dev]/`,
/// depending on `FITHABIT_ENV` (set `FITHABIT_ENV=dev` for the development
/// directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FITHABIT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FITHABIT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("fithabit-dev")
            } else {
                base_dir.join("fithabit")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
