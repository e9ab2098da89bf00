//! In-process collaborators for tests and dry runs.
//!
//! `StaticAdmins` answers admin lookups from a fixed table and can be told to fail
//! or stall per channel; `RecordingDispatcher` keeps every notification it was asked
//! to send and can be told to fail private or channel sends.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use idlewatch_core::{
    AdminResolver, ChannelId, LookupError, MemberId, NotificationDispatcher, NotifyError,
};

#[derive(Default)]
pub struct StaticAdmins {
    admins: Mutex<HashMap<ChannelId, HashSet<MemberId>>>,
    failing: Mutex<HashSet<ChannelId>>,
    stall: Mutex<HashMap<ChannelId, Duration>>,
}

impl StaticAdmins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(self, channel_id: ChannelId, member_id: MemberId) -> Self {
        self.admins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel_id)
            .or_default()
            .insert(member_id);
        self
    }

    pub fn set_failing(&self, channel_id: ChannelId, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(channel_id);
        } else {
            set.remove(&channel_id);
        }
    }

    pub fn set_stall(&self, channel_id: ChannelId, delay: Duration) {
        self.stall
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel_id, delay);
    }
}

#[async_trait]
impl AdminResolver for StaticAdmins {
    async fn get_admins(&self, channel_id: ChannelId) -> Result<HashSet<MemberId>, LookupError> {
        let stall = self
            .stall
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&channel_id)
        {
            return Err(LookupError {
                channel_id,
                message: "simulated lookup failure".into(),
            });
        }
        Ok(self
            .admins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Private(MemberId, String),
    Channel(ChannelId, String),
}

#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Sent>>,
    fail_private: Mutex<bool>,
    fail_channel: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_private(&self, fail: bool) {
        *self.fail_private.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn fail_channel(&self, fail: bool) {
        *self.fail_channel.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Make every send wait before completing.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn private_to(&self, member_id: MemberId) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Private(m, _) if *m == member_id))
            .count()
    }

    pub fn channel_posts(&self, channel_id: ChannelId) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Channel(c, _) if *c == channel_id))
            .count()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_private(&self, member_id: MemberId, text: &str) -> Result<(), NotifyError> {
        self.pause().await;
        if *self.fail_private.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(NotifyError {
                target: format!("member {member_id}"),
                message: "simulated private send failure".into(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Sent::Private(member_id, text.to_string()));
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: ChannelId, html: &str) -> Result<(), NotifyError> {
        self.pause().await;
        if *self.fail_channel.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(NotifyError {
                target: format!("channel {channel_id}"),
                message: "simulated channel send failure".into(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Sent::Channel(channel_id, html.to_string()));
        Ok(())
    }
}
