/// Durable log of channel scans.
///
/// Every channel scan writes a row with its outcome, whether it completed,
/// was aborted by a failed admin lookup, or failed on storage.
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use idlewatch_core::ChannelId;
use idlewatch_ledger::db::{decode_ts, encode_ts};
use idlewatch_ledger::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Ok,
    Aborted,
    Failed,
}

impl ScanStatus {
    fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Ok => "ok",
            ScanStatus::Aborted => "aborted",
            ScanStatus::Failed => "failed",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "ok" => ScanStatus::Ok,
            "aborted" => ScanStatus::Aborted,
            _ => ScanStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub id: String,
    pub channel_id: ChannelId,
    pub started_at: DateTime<Utc>,
    pub status: ScanStatus,
    pub warned: u32,
    pub error: Option<String>,
}

impl ScanLogEntry {
    pub fn new(channel_id: ChannelId, started_at: DateTime<Utc>, status: ScanStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel_id,
            started_at,
            status,
            warned: 0,
            error: None,
        }
    }
}

#[derive(Clone)]
pub struct ScanLog {
    db: Database,
}

impl ScanLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn record(&self, entry: &ScanLogEntry) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO scan_runs (id, channel_id, started_at, status, warned, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.channel_id.0,
                encode_ts(entry.started_at),
                entry.status.as_str(),
                entry.warned,
                entry.error,
            ],
        )?;
        Ok(())
    }

    /// Most recent scans of a channel, newest first.
    pub async fn recent(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<ScanLogEntry>> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, status, warned, error
             FROM scan_runs WHERE channel_id = ?1
             ORDER BY started_at DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![channel_id.0, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, started_at, status, warned, error)| {
                Some(ScanLogEntry {
                    id,
                    channel_id,
                    started_at: decode_ts(&started_at).ok()?,
                    status: ScanStatus::parse(&status),
                    warned,
                    error,
                })
            })
            .collect();
        Ok(entries)
    }

    pub async fn last(&self, channel_id: ChannelId) -> Result<Option<ScanLogEntry>> {
        Ok(self.recent(channel_id, 1).await?.into_iter().next())
    }

    /// Drop entries older than `before`.
    pub async fn prune(&self, before: DateTime<Utc>) -> Result<usize> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let n = conn.execute(
            "DELETE FROM scan_runs WHERE started_at < ?1",
            params![encode_ts(before)],
        )?;
        Ok(n)
    }
}
