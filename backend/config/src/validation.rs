//! Config validation with user-friendly error messages.

use thiserror::Error;

use crate::schema::IdleWatchConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config. `require_token` is set when the bot is about to connect.
pub fn validate(config: &IdleWatchConfig, require_token: bool) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_telegram(config, require_token, &mut report);
    validate_storage(config, &mut report);
    validate_scan(config, &mut report);
    validate_defaults(config, &mut report);
    validate_notifications(config, &mut report);
    report
}

fn validate_telegram(config: &IdleWatchConfig, require_token: bool, report: &mut ValidationReport) {
    let token = config.telegram.as_ref().and_then(|t| t.token.as_deref());
    match token {
        Some(t) if !t.trim().is_empty() => {
            if !t.contains(':') {
                report.warn("telegram.token", "Token does not look like a Telegram bot token");
            }
        }
        _ if require_token => report.error("telegram.token", "Telegram bot token is required"),
        _ => {}
    }
}

fn validate_storage(config: &IdleWatchConfig, report: &mut ValidationReport) {
    let Some(storage) = &config.storage else { return };
    if storage.db_path.as_deref().is_some_and(|p| p.trim().is_empty()) {
        report.error("storage.dbPath", "Database path cannot be empty");
    }
}

fn validate_scan(config: &IdleWatchConfig, report: &mut ValidationReport) {
    let Some(scan) = &config.scan else { return };
    if scan.interval_secs == Some(0) {
        report.error("scan.intervalSecs", "intervalSecs must be > 0");
    } else if scan.interval_secs.is_some_and(|s| s < 60) {
        report.warn("scan.intervalSecs", "Scanning more than once a minute is unusual");
    }
    if scan.admin_lookup_timeout_secs == Some(0) {
        report.error("scan.adminLookupTimeoutSecs", "adminLookupTimeoutSecs must be > 0");
    }
}

fn validate_defaults(config: &IdleWatchConfig, report: &mut ValidationReport) {
    let Some(defaults) = &config.defaults else { return };
    for (path, days) in [
        ("defaults.inactivityThresholdDays", defaults.inactivity_threshold_days),
        ("defaults.newMemberGraceDays", defaults.new_member_grace_days),
    ] {
        if let Some(d) = days {
            if d <= 0 || u32::try_from(d).is_err() {
                report.error(path, format!("must be a positive number of days, got {d}"));
            }
        }
    }
}

fn validate_notifications(config: &IdleWatchConfig, report: &mut ValidationReport) {
    let Some(n) = &config.notifications else { return };
    if let Some(t) = &n.private_template {
        if !t.contains("{days}") {
            report.warn("notifications.privateTemplate", "Template does not mention {days}");
        }
    }
    if let Some(t) = &n.channel_template {
        if !t.contains("{mention}") {
            report.warn("notifications.channelTemplate", "Template does not mention {mention}");
        }
    }
}
