//! Configuration loader for Tasklane.
//!
//! Reads `config.toml` and deserializes it into [`TasklaneConfig`]. Falls
//! back to defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use tasklane_types::config::TasklaneConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TASKLANE_CONFIG";

/// Resolve the config file location.
///
/// Priority:
/// 1. Explicit path (the `--config` flag)
/// 2. `TASKLANE_CONFIG`
/// 3. `~/.tasklane/config.toml`
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .map(|home| home.join(".tasklane"))
        .unwrap_or_else(|| PathBuf::from(".tasklane"))
        .join("config.toml")
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`TasklaneConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
pub async fn load_config(path: &Path) -> TasklaneConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return TasklaneConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return TasklaneConfig::default();
        }
    };

    match toml::from_str::<TasklaneConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            TasklaneConfig::default()
        }
    }
}
