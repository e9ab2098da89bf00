//! Config file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::env::resolve_env_vars;
use crate::schema::IdleWatchConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "IDLEWATCH_CONFIG";

/// Resolve the idlewatch config directory: `~/.idlewatch/`.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".idlewatch"))
        .unwrap_or_else(|| PathBuf::from(".idlewatch"))
}

/// Resolve the config file path.
/// Priority: explicit path (`--config`) > `IDLEWATCH_CONFIG` > `~/.idlewatch/config.yaml`.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    config_dir().join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk, substituting `${VAR}` references.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<IdleWatchConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(IdleWatchConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&raw)
        .with_context(|| format!("Failed to load config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse YAML text and resolve env references in its string values.
pub fn parse_config(raw: &str) -> Result<IdleWatchConfig> {
    if raw.trim().is_empty() {
        return Ok(IdleWatchConfig::default());
    }
    let value: Value = serde_yaml::from_str(raw).context("Failed to parse config YAML")?;
    if value.is_null() {
        return Ok(IdleWatchConfig::default());
    }
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    serde_json::from_value(value).context("Config does not match the expected schema")
}
