use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{LookupError, NotifyError};
use crate::message::Message;
use crate::types::{ChannelId, MemberId};

/// Trait for long-running idlewatch components (the scheduler loop).
///
/// Each component consumes messages from its receiver and runs in its own Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Start the component's event loop, consuming from the given receiver.
    async fn start(&self, rx: mpsc::Receiver<Message>) -> Result<()>;
}

/// Resolves the current administrators (owner included) of a channel.
///
/// Results may be stale; failures are transient and retried on the next cycle.
#[async_trait]
pub trait AdminResolver: Send + Sync {
    async fn get_admins(&self, channel_id: ChannelId) -> Result<HashSet<MemberId>, LookupError>;
}

/// Delivers warnings to members and announcements to channels.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send a direct message to a member.
    async fn send_private(&self, member_id: MemberId, text: &str) -> Result<(), NotifyError>;

    /// Post HTML text (already escaped, may contain a member mention) to a channel.
    async fn send_to_channel(&self, channel_id: ChannelId, html: &str) -> Result<(), NotifyError>;
}
