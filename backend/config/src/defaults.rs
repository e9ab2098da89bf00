//! Config defaults: applies default values to parsed config.

use idlewatch_core::{
    NotifyMode, DEFAULT_INACTIVITY_THRESHOLD_DAYS, DEFAULT_NEW_MEMBER_GRACE_DAYS,
};

use crate::schema::{
    DefaultsConfig, IdleWatchConfig, LoggingConfig, NotificationsConfig, ScanConfig,
    StorageConfig,
};

pub const DEFAULT_DB_PATH: &str = "idlewatch.db";

/// Once a day.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 86_400;

pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 10;

pub const DEFAULT_ADMIN_LOOKUP_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 90;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: IdleWatchConfig) -> IdleWatchConfig {
    let config = apply_storage_defaults(config);
    let config = apply_scan_defaults(config);
    let config = apply_threshold_defaults(config);
    let config = apply_notification_defaults(config);
    apply_logging_defaults(config)
}

fn apply_storage_defaults(mut config: IdleWatchConfig) -> IdleWatchConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    storage
        .db_path
        .get_or_insert_with(|| DEFAULT_DB_PATH.to_string());
    config
}

fn apply_scan_defaults(mut config: IdleWatchConfig) -> IdleWatchConfig {
    let scan = config.scan.get_or_insert_with(ScanConfig::default);
    scan.interval_secs.get_or_insert(DEFAULT_SCAN_INTERVAL_SECS);
    scan.initial_delay_secs.get_or_insert(DEFAULT_INITIAL_DELAY_SECS);
    scan.admin_lookup_timeout_secs
        .get_or_insert(DEFAULT_ADMIN_LOOKUP_TIMEOUT_SECS);
    scan.log_retention_days.get_or_insert(DEFAULT_LOG_RETENTION_DAYS);
    config
}

fn apply_threshold_defaults(mut config: IdleWatchConfig) -> IdleWatchConfig {
    let defaults = config.defaults.get_or_insert_with(DefaultsConfig::default);
    defaults
        .inactivity_threshold_days
        .get_or_insert(i64::from(DEFAULT_INACTIVITY_THRESHOLD_DAYS));
    defaults
        .new_member_grace_days
        .get_or_insert(i64::from(DEFAULT_NEW_MEMBER_GRACE_DAYS));
    config
}

/// Templates stay unset here; the scanner owns the default wording.
fn apply_notification_defaults(mut config: IdleWatchConfig) -> IdleWatchConfig {
    let notifications = config
        .notifications
        .get_or_insert_with(NotificationsConfig::default);
    notifications.mode.get_or_insert(NotifyMode::default());
    config
}

fn apply_logging_defaults(mut config: IdleWatchConfig) -> IdleWatchConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(IdleWatchConfig::default());
        let scan = cfg.scan.unwrap();
        assert_eq!(scan.interval_secs, Some(DEFAULT_SCAN_INTERVAL_SECS));
        assert_eq!(scan.initial_delay_secs, Some(DEFAULT_INITIAL_DELAY_SECS));
        assert_eq!(cfg.storage.unwrap().db_path.as_deref(), Some(DEFAULT_DB_PATH));
        let defaults = cfg.defaults.unwrap();
        assert_eq!(defaults.inactivity_threshold_days, Some(14));
        assert_eq!(defaults.new_member_grace_days, Some(3));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
        assert!(cfg.telegram.is_none());
    }

    #[test]
    fn keeps_explicit_values() {
        let mut cfg = IdleWatchConfig::default();
        cfg.scan = Some(ScanConfig {
            interval_secs: Some(60),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        let scan = cfg.scan.unwrap();
        assert_eq!(scan.interval_secs, Some(60));
        assert_eq!(scan.admin_lookup_timeout_secs, Some(DEFAULT_ADMIN_LOOKUP_TIMEOUT_SECS));
    }
}
