use thiserror::Error;

use crate::types::{ChannelId, MemberId};

/// Top-level error type for the idlewatch runtime.
#[derive(Debug, Error)]
pub enum IdleWatchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("caller {0} is not an administrator of this channel")]
    Unauthorized(MemberId),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("a scan of channel {0} is already running")]
    ScanInProgress(ChannelId),

    #[error("malformed record for member {member_id} in channel {channel_id}: {reason}")]
    MalformedRecord {
        channel_id: ChannelId,
        member_id: MemberId,
        reason: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IdleWatchError {
    /// Whether the failure should simply be retried next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IdleWatchError::Lookup(_) | IdleWatchError::Notify(_) | IdleWatchError::ScanInProgress(_)
        )
    }
}

/// The administrator lookup for a channel failed or timed out.
#[derive(Debug, Clone, Error)]
#[error("admin lookup failed for channel {channel_id}: {message}")]
pub struct LookupError {
    pub channel_id: ChannelId,
    pub message: String,
}

/// A notification could not be delivered.
#[derive(Debug, Clone, Error)]
#[error("failed to notify {target}: {message}")]
pub struct NotifyError {
    pub target: String,
    pub message: String,
}
