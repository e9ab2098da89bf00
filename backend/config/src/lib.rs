//! `idlewatch-config`: idlewatch runtime configuration.
//!
//! Provides:
//! - Typed config schema (Telegram, storage, scan cadence, thresholds, notifications, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Default value application
//! - Validation report
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, parse_config, CONFIG_PATH_ENV};
pub use redact::redact;
pub use schema::IdleWatchConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use anyhow::{bail, Result};

/// Validate a loaded config (defaults already applied), logging warnings.
/// Any validation error fails.
pub fn prepare(config: IdleWatchConfig, path: &Path, require_token: bool) -> Result<IdleWatchConfig> {
    let report = validate(&config, require_token);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "Invalid config at {}: {}",
            path.display(),
            report
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        );
    }

    Ok(config)
}
