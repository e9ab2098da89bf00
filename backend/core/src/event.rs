use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, MemberId};

/// A member was observed doing something in a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub channel_id: ChannelId,
    pub member_id: MemberId,
    pub timestamp: DateTime<Utc>,
    pub is_bot: bool,
}

impl ActivityEvent {
    /// Bot traffic never reaches the ledger.
    pub fn should_record(&self) -> bool {
        !self.is_bot
    }
}

/// Membership status of a user in a channel, as reported by the transport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemberStatus::Owner => "owner",
            MemberStatus::Administrator => "administrator",
            MemberStatus::Member => "member",
            MemberStatus::Restricted => "restricted",
            MemberStatus::Left => "left",
            MemberStatus::Kicked => "kicked",
        };
        write!(f, "{}", s)
    }
}

/// A membership status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinEvent {
    pub channel_id: ChannelId,
    pub member_id: MemberId,
    pub timestamp: DateTime<Utc>,
    pub previous_status: MemberStatus,
    pub new_status: MemberStatus,
}

impl JoinEvent {
    /// Only `left|kicked -> member` transitions count as a join.
    pub fn is_join(&self) -> bool {
        matches!(self.previous_status, MemberStatus::Left | MemberStatus::Kicked)
            && self.new_status == MemberStatus::Member
    }
}
