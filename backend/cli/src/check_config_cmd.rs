//! `check-config`: show the resolved config with secrets masked and validate it.

use std::path::Path;

use anyhow::Result;

use idlewatch_config::{apply_all_defaults, load_config, redact, validate};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

/// Returns whether the config is valid for running the bot.
pub async fn run(path: &Path) -> Result<bool> {
    if path.exists() {
        note_info(&format!("Config file: {}", path.display()));
    } else {
        note_warn(&format!(
            "Config file {} not found; showing built-in defaults",
            path.display()
        ));
    }

    let config = apply_all_defaults(load_config(path).await?);
    let shown = redact(&serde_json::to_value(&config)?);
    println!("{}", serde_json::to_string_pretty(&shown)?);

    let report = validate(&config, true);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if report.is_valid() {
        note_success("Config is valid.");
    }
    Ok(report.is_valid())
}
