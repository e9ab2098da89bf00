use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use idlewatch_core::{ChannelId, IdleWatchError, MemberId, MembershipRecord};

/// Durable mapping from `(channel, member)` to a membership record.
///
/// Implementations serialize updates to the same key; different keys are independent.
#[async_trait]
pub trait ActivityLedger: Send + Sync {
    /// Insert a fresh record, or bump `last_activity_at` (never backwards) and clear `warned`.
    async fn record_activity(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<(), IdleWatchError>;

    /// Insert a fresh record only if none exists. Returns whether a row was created.
    async fn record_join(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError>;

    /// All readable records of a channel, in no particular order.
    async fn list_by_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<MembershipRecord>, IdleWatchError>;

    /// Channels with at least one record.
    async fn list_channels(&self) -> Result<Vec<ChannelId>, IdleWatchError>;

    async fn get(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<Option<MembershipRecord>, IdleWatchError>;

    /// Set `warned`. A missing record is not an error; returns whether a row changed.
    async fn mark_warned(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<bool, IdleWatchError>;

    /// Set `warned` only if `last_activity_at` still equals what the caller observed,
    /// so activity that lands mid-scan is never overwritten by a stale warning.
    async fn mark_warned_if_idle_since(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        observed_last_activity: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError>;
}

/// Ledger kept in process memory. Used by tests and dry runs.
pub struct InMemoryLedger {
    records: RwLock<HashMap<(ChannelId, MemberId), MembershipRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Replace a record wholesale. Test seeding only.
    pub async fn put(&self, record: MembershipRecord) {
        self.records
            .write()
            .await
            .insert((record.channel_id, record.member_id), record);
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityLedger for InMemoryLedger {
    async fn record_activity(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<(), IdleWatchError> {
        let mut records = self.records.write().await;
        records
            .entry((channel_id, member_id))
            .and_modify(|r| {
                r.last_activity_at = r.last_activity_at.max(at);
                r.warned = false;
            })
            .or_insert_with(|| MembershipRecord::new(channel_id, member_id, at));
        Ok(())
    }

    async fn record_join(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError> {
        let mut records = self.records.write().await;
        if records.contains_key(&(channel_id, member_id)) {
            return Ok(false);
        }
        records.insert(
            (channel_id, member_id),
            MembershipRecord::new(channel_id, member_id, at),
        );
        Ok(true)
    }

    async fn list_by_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<MembershipRecord>, IdleWatchError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelId>, IdleWatchError> {
        let records = self.records.read().await;
        let channels: BTreeSet<ChannelId> = records.keys().map(|(c, _)| *c).collect();
        Ok(channels.into_iter().collect())
    }

    async fn get(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<Option<MembershipRecord>, IdleWatchError> {
        Ok(self.records.read().await.get(&(channel_id, member_id)).cloned())
    }

    async fn mark_warned(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<bool, IdleWatchError> {
        let mut records = self.records.write().await;
        Ok(match records.get_mut(&(channel_id, member_id)) {
            Some(r) => {
                r.warned = true;
                true
            }
            None => false,
        })
    }

    async fn mark_warned_if_idle_since(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        observed_last_activity: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError> {
        let mut records = self.records.write().await;
        Ok(match records.get_mut(&(channel_id, member_id)) {
            Some(r) if r.last_activity_at == observed_last_activity => {
                r.warned = true;
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const CHAT: ChannelId = ChannelId(-100123);
    const USER: MemberId = MemberId(42);

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    #[tokio::test]
    async fn test_activity_creates_then_updates() {
        let ledger = InMemoryLedger::new();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        ledger.record_activity(CHAT, USER, t(5)).await.unwrap();
        let r = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert_eq!(r.joined_at, t(0));
        assert_eq!(r.last_activity_at, t(5));
        assert!(!r.warned);
    }

    #[tokio::test]
    async fn test_activity_never_moves_backwards_but_rearms() {
        let ledger = InMemoryLedger::new();
        ledger.record_activity(CHAT, USER, t(10)).await.unwrap();
        ledger.mark_warned(CHAT, USER).await.unwrap();
        ledger.record_activity(CHAT, USER, t(3)).await.unwrap();
        let r = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert_eq!(r.last_activity_at, t(10));
        assert!(!r.warned);
    }

    #[tokio::test]
    async fn test_join_is_insert_or_ignore() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.record_join(CHAT, USER, t(0)).await.unwrap());
        let first = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert!(!ledger.record_join(CHAT, USER, t(9)).await.unwrap());
        assert_eq!(ledger.get(CHAT, USER).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn test_mark_warned_missing_is_noop() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.mark_warned(CHAT, USER).await.unwrap());
        assert!(ledger.get(CHAT, USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_mark_skips_fresh_activity() {
        let ledger = InMemoryLedger::new();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        ledger.record_activity(CHAT, USER, t(20)).await.unwrap();
        assert!(!ledger.mark_warned_if_idle_since(CHAT, USER, t(0)).await.unwrap());
        assert!(ledger.mark_warned_if_idle_since(CHAT, USER, t(20)).await.unwrap());
        assert!(ledger.get(CHAT, USER).await.unwrap().unwrap().warned);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let ledger = InMemoryLedger::new();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        ledger.record_activity(ChannelId(-5), USER, t(0)).await.unwrap();
        assert_eq!(ledger.list_by_channel(CHAT).await.unwrap().len(), 1);
        assert_eq!(ledger.list_channels().await.unwrap(), vec![CHAT, ChannelId(-5)]);
    }
}
