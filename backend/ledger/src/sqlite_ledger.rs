/// SQLite-backed activity ledger.
///
/// Rows live in the `memberships` table keyed by `(channel_id, member_id)`.
/// Activity upserts use `ON CONFLICT` so a join racing an activity event for a
/// new key always converges on one row.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, warn};

use idlewatch_core::{ChannelId, IdleWatchError, MemberId, MembershipRecord};

use crate::db::{decode_ts, encode_ts, storage_err, Database};
use crate::ledger::ActivityLedger;

pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Raw row before timestamp parsing.
struct RawMembership {
    channel_id: i64,
    member_id: i64,
    last_activity_at: String,
    joined_at: String,
    warned: bool,
}

impl RawMembership {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            channel_id: row.get(0)?,
            member_id: row.get(1)?,
            last_activity_at: row.get(2)?,
            joined_at: row.get(3)?,
            warned: row.get::<_, i64>(4)? != 0,
        })
    }

    fn into_record(self) -> Result<MembershipRecord, IdleWatchError> {
        let channel_id = ChannelId(self.channel_id);
        let member_id = MemberId(self.member_id);
        let malformed = |field: &str, raw: &str, e: chrono::ParseError| {
            IdleWatchError::MalformedRecord {
                channel_id,
                member_id,
                reason: format!("{field}={raw:?}: {e}"),
            }
        };
        let last_activity_at = decode_ts(&self.last_activity_at)
            .map_err(|e| malformed("last_activity_at", &self.last_activity_at, e))?;
        let joined_at =
            decode_ts(&self.joined_at).map_err(|e| malformed("joined_at", &self.joined_at, e))?;
        Ok(MembershipRecord {
            channel_id,
            member_id,
            last_activity_at,
            joined_at,
            warned: self.warned,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT channel_id, member_id, last_activity_at, joined_at, warned FROM memberships";

#[async_trait]
impl ActivityLedger for SqliteLedger {
    async fn record_activity(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<(), IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO memberships (channel_id, member_id, last_activity_at, joined_at, warned)
             VALUES (?1, ?2, ?3, ?3, 0)
             ON CONFLICT(channel_id, member_id) DO UPDATE SET
                 last_activity_at = MAX(last_activity_at, excluded.last_activity_at),
                 warned = 0",
            params![channel_id.0, member_id.0, encode_ts(at)],
        )
        .map_err(storage_err)?;
        debug!(channel_id = %channel_id, member_id = %member_id, "Recorded activity");
        Ok(())
    }

    async fn record_join(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        at: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let n = conn
            .execute(
                "INSERT OR IGNORE INTO memberships
                 (channel_id, member_id, last_activity_at, joined_at, warned)
                 VALUES (?1, ?2, ?3, ?3, 0)",
                params![channel_id.0, member_id.0, encode_ts(at)],
            )
            .map_err(storage_err)?;
        debug!(channel_id = %channel_id, member_id = %member_id, inserted = n == 1, "Recorded join");
        Ok(n == 1)
    }

    async fn list_by_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<MembershipRecord>, IdleWatchError> {
        let raw: Vec<RawMembership> = {
            let conn = self.db.connection();
            let conn = conn.lock().await;
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE channel_id = ?1"))
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(params![channel_id.0], RawMembership::from_row)
                .map_err(storage_err)?;
            let raw = rows.collect::<rusqlite::Result<_>>().map_err(storage_err)?;
            raw
        };

        let mut records = Vec::with_capacity(raw.len());
        for row in raw {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping unreadable membership row"),
            }
        }
        Ok(records)
    }

    async fn list_channels(&self) -> Result<Vec<ChannelId>, IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT DISTINCT channel_id FROM memberships ORDER BY channel_id")
            .map_err(storage_err)?;
        let channels = stmt
            .query_map([], |row| row.get::<_, i64>(0).map(ChannelId))
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;
        Ok(channels)
    }

    async fn get(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<Option<MembershipRecord>, IdleWatchError> {
        let raw = {
            let conn = self.db.connection();
            let conn = conn.lock().await;
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS} WHERE channel_id = ?1 AND member_id = ?2"
                ))
                .map_err(storage_err)?;
            let mut rows = stmt
                .query_map(params![channel_id.0, member_id.0], RawMembership::from_row)
                .map_err(storage_err)?;
            let row = rows.next().transpose().map_err(storage_err)?;
            row
        };
        raw.map(RawMembership::into_record).transpose()
    }

    async fn mark_warned(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
    ) -> Result<bool, IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let n = conn
            .execute(
                "UPDATE memberships SET warned = 1 WHERE channel_id = ?1 AND member_id = ?2",
                params![channel_id.0, member_id.0],
            )
            .map_err(storage_err)?;
        Ok(n > 0)
    }

    async fn mark_warned_if_idle_since(
        &self,
        channel_id: ChannelId,
        member_id: MemberId,
        observed_last_activity: DateTime<Utc>,
    ) -> Result<bool, IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let n = conn
            .execute(
                "UPDATE memberships SET warned = 1
                 WHERE channel_id = ?1 AND member_id = ?2 AND last_activity_at = ?3",
                params![channel_id.0, member_id.0, encode_ts(observed_last_activity)],
            )
            .map_err(storage_err)?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    const CHAT: ChannelId = ChannelId(-100777);
    const USER: MemberId = MemberId(9);

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap() + Duration::days(day)
    }

    fn ledger() -> SqliteLedger {
        SqliteLedger::new(Database::in_memory().expect("in-memory db"))
    }

    #[tokio::test]
    async fn test_activity_upsert_and_rearm() {
        let ledger = ledger();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        assert!(ledger.mark_warned(CHAT, USER).await.unwrap());
        assert!(ledger.get(CHAT, USER).await.unwrap().unwrap().warned);

        ledger.record_activity(CHAT, USER, t(16)).await.unwrap();
        let r = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert!(!r.warned);
        assert_eq!(r.joined_at, t(0));
        assert_eq!(r.last_activity_at, t(16));
    }

    #[tokio::test]
    async fn test_out_of_order_activity_keeps_latest() {
        let ledger = ledger();
        ledger.record_activity(CHAT, USER, t(8)).await.unwrap();
        ledger.record_activity(CHAT, USER, t(2)).await.unwrap();
        let r = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert_eq!(r.last_activity_at, t(8));
    }

    #[tokio::test]
    async fn test_join_twice_is_noop() {
        let ledger = ledger();
        assert!(ledger.record_join(CHAT, USER, t(0)).await.unwrap());
        let first = ledger.get(CHAT, USER).await.unwrap();
        assert!(!ledger.record_join(CHAT, USER, t(4)).await.unwrap());
        assert_eq!(ledger.get(CHAT, USER).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_join_never_overwrites_history() {
        let ledger = ledger();
        ledger.record_activity(CHAT, USER, t(1)).await.unwrap();
        assert!(!ledger.record_join(CHAT, USER, t(30)).await.unwrap());
        let r = ledger.get(CHAT, USER).await.unwrap().unwrap();
        assert_eq!(r.joined_at, t(1));
        assert_eq!(r.last_activity_at, t(1));
    }

    #[tokio::test]
    async fn test_concurrent_join_and_activity_yield_one_row() {
        let ledger = Arc::new(ledger());
        let a = {
            let l = Arc::clone(&ledger);
            tokio::spawn(async move { l.record_join(CHAT, USER, t(0)).await })
        };
        let b = {
            let l = Arc::clone(&ledger);
            tokio::spawn(async move { l.record_activity(CHAT, USER, t(0)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(ledger.list_by_channel(CHAT).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_row_is_skipped() {
        let db = Database::in_memory().unwrap();
        let ledger = SqliteLedger::new(db.clone());
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        {
            let conn = db.connection();
            let conn = conn.lock().await;
            conn.execute(
                "INSERT INTO memberships VALUES (?1, 10, 'yesterday-ish', 'n/a', 0)",
                params![CHAT.0],
            )
            .unwrap();
        }
        let rows = ledger.list_by_channel(CHAT).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member_id, USER);
        assert!(matches!(
            ledger.get(CHAT, MemberId(10)).await,
            Err(IdleWatchError::MalformedRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_guarded_mark_respects_new_activity() {
        let ledger = ledger();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        ledger.record_activity(CHAT, USER, t(3)).await.unwrap();
        assert!(!ledger.mark_warned_if_idle_since(CHAT, USER, t(0)).await.unwrap());
        assert!(!ledger.get(CHAT, USER).await.unwrap().unwrap().warned);
        assert!(ledger.mark_warned_if_idle_since(CHAT, USER, t(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_channels_and_missing_mark() {
        let ledger = ledger();
        ledger.record_activity(CHAT, USER, t(0)).await.unwrap();
        ledger.record_join(ChannelId(-1), USER, t(0)).await.unwrap();
        assert_eq!(
            ledger.list_channels().await.unwrap(),
            vec![CHAT, ChannelId(-1)]
        );
        assert!(!ledger.mark_warned(ChannelId(-2), USER).await.unwrap());
    }
}
