/// Shared SQLite handle for the ledger, the config store, and the scan log.
///
/// One connection guarded by an async mutex. Every store operation is a single
/// SQL statement, which makes each per-key update atomic.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use idlewatch_core::IdleWatchError;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memberships (
    channel_id       INTEGER NOT NULL,
    member_id        INTEGER NOT NULL,
    last_activity_at TEXT NOT NULL,
    joined_at        TEXT NOT NULL,
    warned           INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (channel_id, member_id)
);
CREATE TABLE IF NOT EXISTS channel_configs (
    channel_id                INTEGER PRIMARY KEY,
    inactivity_threshold_days INTEGER,
    new_member_grace_days     INTEGER,
    updated_at                TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS scan_runs (
    id          TEXT PRIMARY KEY,
    channel_id  INTEGER NOT NULL,
    started_at  TEXT NOT NULL,
    status      TEXT NOT NULL,
    warned      INTEGER NOT NULL DEFAULT 0,
    error       TEXT
);
CREATE INDEX IF NOT EXISTS idx_scan_runs_channel ON scan_runs(channel_id, started_at);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open SQLite database at {:?}", path.as_ref()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize idlewatch schema")?;
        info!("Database opened at {:?}", path.as_ref());
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// The shared connection. Callers must keep each critical section to one statement
    /// or one short transaction.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that SQL string
/// comparison orders them chronologically.
pub fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

pub(crate) fn storage_err(e: rusqlite::Error) -> IdleWatchError {
    IdleWatchError::Storage(e.to_string())
}
