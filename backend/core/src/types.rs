use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdleWatchError;

/// Days of silence before a member becomes warn-eligible, absent a channel override.
pub const DEFAULT_INACTIVITY_THRESHOLD_DAYS: u32 = 14;

/// Days after joining during which a member cannot be warned, absent a channel override.
pub const DEFAULT_NEW_MEMBER_GRACE_DAYS: u32 = 3;

/// Identifier of a group channel (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

/// Identifier of a member inside a channel (a Telegram user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the activity ledger, unique per `(channel_id, member_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub channel_id: ChannelId,
    pub member_id: MemberId,
    pub last_activity_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    /// Set by the scanner, cleared by any new activity.
    pub warned: bool,
}

impl MembershipRecord {
    /// A fresh record as created by the first observed activity or join.
    pub fn new(channel_id: ChannelId, member_id: MemberId, at: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            member_id,
            last_activity_at: at,
            joined_at: at,
            warned: false,
        }
    }

    /// Whole days elapsed since the last observed activity.
    pub fn idle_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity_at).num_days()
    }

    /// Whole days elapsed since the member joined.
    pub fn membership_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.joined_at).num_days()
    }
}

/// Stored per-channel overrides. `None` fields fall back to the global defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: ChannelId,
    pub inactivity_threshold_days: Option<u32>,
    pub new_member_grace_days: Option<u32>,
}

impl ChannelConfig {
    /// Resolve field by field against the given defaults.
    pub fn resolve(&self, defaults: &EffectiveConfig) -> EffectiveConfig {
        EffectiveConfig {
            inactivity_threshold_days: self
                .inactivity_threshold_days
                .unwrap_or(defaults.inactivity_threshold_days),
            new_member_grace_days: self
                .new_member_grace_days
                .unwrap_or(defaults.new_member_grace_days),
        }
    }
}

/// Thresholds in force for one channel at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub inactivity_threshold_days: u32,
    pub new_member_grace_days: u32,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_days: DEFAULT_INACTIVITY_THRESHOLD_DAYS,
            new_member_grace_days: DEFAULT_NEW_MEMBER_GRACE_DAYS,
        }
    }
}

/// Which notifications the scanner attempts for a warn-eligible member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Private warning plus a channel announcement, attempted independently.
    #[default]
    PrivateAndChannel,
    ChannelOnly,
    PrivateOnly,
}

impl NotifyMode {
    pub fn sends_private(self) -> bool {
        matches!(self, NotifyMode::PrivateAndChannel | NotifyMode::PrivateOnly)
    }

    pub fn sends_channel(self) -> bool {
        matches!(self, NotifyMode::PrivateAndChannel | NotifyMode::ChannelOnly)
    }
}

/// Accept a day count from a configuration command. Zero and negatives are rejected.
pub fn validate_days(days: i64) -> Result<u32, IdleWatchError> {
    if days <= 0 {
        return Err(IdleWatchError::InvalidConfig(format!(
            "days must be a positive number, got {days}"
        )));
    }
    u32::try_from(days)
        .map_err(|_| IdleWatchError::InvalidConfig(format!("{days} days is out of range")))
}
