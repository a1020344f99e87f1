mod config;
pub mod database;

pub use config::{CatalogConfig, Config, JournalConfig, StatsConfig, TimelineConfig};
pub use database::{Database, IngestionStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `DOSELOG_DATA_DIR` overrides the location. Otherwise it is
/// `~/.config/doselog/`, or `~/.config/doselog-dev/` when `DOSELOG_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("DOSELOG_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DOSELOG_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("doselog-dev")
            } else {
                base_dir.join("doselog")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
