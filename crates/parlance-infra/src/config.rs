//! Configuration loader for Parlance.
//!
//! Reads `config.toml` from the data directory (`~/.parlance/` in
//! production) and deserializes it into [`AppConfig`]. Falls back to
//! defaults when the file is missing or malformed, so a fresh install runs
//! with zero setup.

use std::path::{Path, PathBuf};

use parlance_types::config::AppConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Resolve the data directory: `PARLANCE_DATA_DIR`, then `~/.parlance`,
/// then `./.parlance` as a last resort.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLANCE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parlance");
    }

    PathBuf::from(".parlance")
}

/// Resolve the SQLite database file path for `config` under `data_dir`.
///
/// `storage.database_path` overrides the default `{data_dir}/parlance.db`.
pub fn resolve_database_path(config: &AppConfig, data_dir: &Path) -> PathBuf {
    match &config.storage.database_path {
        Some(path) => PathBuf::from(path),
        None => data_dir.join("parlance.db"),
    }
}
