//! idlewatch runtime configuration schema.
//!
//! Every section and field is optional in the file; `defaults::apply_all_defaults`
//! fills in what was left out.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use idlewatch_core::{validate_days, EffectiveConfig, IdleWatchError, NotifyMode};

use crate::defaults::{
    DEFAULT_ADMIN_LOOKUP_TIMEOUT_SECS, DEFAULT_DB_PATH, DEFAULT_INITIAL_DELAY_SECS,
    DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_LOG_RETENTION_DAYS, DEFAULT_SCAN_INTERVAL_SECS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleWatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Scan cadence and admin lookup bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanConfig>,

    /// Global thresholds used by channels without an override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_lookup_timeout_secs: Option<u64>,
    /// Scan log rows older than this are pruned after each cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_retention_days: Option<u32>,
}

/// Day counts are signed so that a bad value surfaces as a validation error
/// instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivity_threshold_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_member_grace_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<NotifyMode>,
    /// Plain text sent privately; `{days}` and `{threshold}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_template: Option<String>,
    /// HTML posted to the group; `{mention}`, `{days}` and `{threshold}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl IdleWatchConfig {
    pub fn token(&self) -> Option<&str> {
        self.telegram
            .as_ref()
            .and_then(|t| t.token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(
            self.storage
                .as_ref()
                .and_then(|s| s.db_path.as_deref())
                .unwrap_or(DEFAULT_DB_PATH),
        )
    }

    fn scan_secs(&self, pick: fn(&ScanConfig) -> Option<u64>, default: u64) -> Duration {
        Duration::from_secs(self.scan.as_ref().and_then(pick).unwrap_or(default))
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_secs(|s| s.interval_secs, DEFAULT_SCAN_INTERVAL_SECS)
    }

    pub fn initial_delay(&self) -> Duration {
        self.scan_secs(|s| s.initial_delay_secs, DEFAULT_INITIAL_DELAY_SECS)
    }

    pub fn admin_lookup_timeout(&self) -> Duration {
        self.scan_secs(
            |s| s.admin_lookup_timeout_secs,
            DEFAULT_ADMIN_LOOKUP_TIMEOUT_SECS,
        )
    }

    pub fn log_retention_days(&self) -> u32 {
        self.scan
            .as_ref()
            .and_then(|s| s.log_retention_days)
            .unwrap_or(DEFAULT_LOG_RETENTION_DAYS)
    }

    /// Global thresholds, rejecting non-positive day counts.
    pub fn effective_defaults(&self) -> Result<EffectiveConfig, IdleWatchError> {
        let base = EffectiveConfig::default();
        let Some(d) = &self.defaults else {
            return Ok(base);
        };
        Ok(EffectiveConfig {
            inactivity_threshold_days: d
                .inactivity_threshold_days
                .map(validate_days)
                .transpose()?
                .unwrap_or(base.inactivity_threshold_days),
            new_member_grace_days: d
                .new_member_grace_days
                .map(validate_days)
                .transpose()?
                .unwrap_or(base.new_member_grace_days),
        })
    }

    pub fn notify_mode(&self) -> NotifyMode {
        self.notifications
            .as_ref()
            .and_then(|n| n.mode)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(
            self.logging
                .as_ref()
                .and_then(|l| l.dir.as_deref())
                .unwrap_or(DEFAULT_LOG_DIR),
        )
    }
}
