/// SQLite-backed per-channel threshold store (`channel_configs` table).
///
/// Each setter is one upsert. On first insert the other field is written with
/// the current default so later changes to the global defaults do not move it.
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use tracing::info;

use idlewatch_core::{validate_days, ChannelConfig, ChannelId, EffectiveConfig, IdleWatchError};

use crate::config_store::ConfigStore;
use crate::db::{encode_ts, storage_err, Database};

pub struct SqliteConfigStore {
    db: Database,
    defaults: EffectiveConfig,
}

impl SqliteConfigStore {
    pub fn new(db: Database, defaults: EffectiveConfig) -> Self {
        Self { db, defaults }
    }
}

fn days_to_opt(raw: Option<i64>) -> Option<u32> {
    raw.and_then(|d| u32::try_from(d).ok()).filter(|d| *d > 0)
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    fn defaults(&self) -> EffectiveConfig {
        self.defaults
    }

    async fn get_explicit(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelConfig>, IdleWatchError> {
        let conn = self.db.connection();
        let conn = conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT inactivity_threshold_days, new_member_grace_days
                 FROM channel_configs WHERE channel_id = ?1",
            )
            .map_err(storage_err)?;
        let mut rows = stmt
            .query_map(params![channel_id.0], |row| {
                Ok(ChannelConfig {
                    channel_id,
                    inactivity_threshold_days: days_to_opt(row.get(0)?),
                    new_member_grace_days: days_to_opt(row.get(1)?),
                })
            })
            .map_err(storage_err)?;
        let cfg = rows.next().transpose().map_err(storage_err)?;
        Ok(cfg)
    }

    async fn set_inactivity_threshold(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError> {
        let days = validate_days(days)?;
        {
            let conn = self.db.connection();
            let conn = conn.lock().await;
            conn.execute(
                "INSERT INTO channel_configs
                 (channel_id, inactivity_threshold_days, new_member_grace_days, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     inactivity_threshold_days = excluded.inactivity_threshold_days,
                     new_member_grace_days = COALESCE(channel_configs.new_member_grace_days,
                                                      excluded.new_member_grace_days),
                     updated_at = excluded.updated_at",
                params![
                    channel_id.0,
                    days,
                    self.defaults.new_member_grace_days,
                    encode_ts(Utc::now())
                ],
            )
            .map_err(storage_err)?;
        }
        info!(channel_id = %channel_id, days, "Inactivity threshold updated");
        self.get(channel_id).await
    }

    async fn set_new_member_grace(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError> {
        let days = validate_days(days)?;
        {
            let conn = self.db.connection();
            let conn = conn.lock().await;
            conn.execute(
                "INSERT INTO channel_configs
                 (channel_id, inactivity_threshold_days, new_member_grace_days, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     new_member_grace_days = excluded.new_member_grace_days,
                     inactivity_threshold_days = COALESCE(channel_configs.inactivity_threshold_days,
                                                          excluded.inactivity_threshold_days),
                     updated_at = excluded.updated_at",
                params![
                    channel_id.0,
                    self.defaults.inactivity_threshold_days,
                    days,
                    encode_ts(Utc::now())
                ],
            )
            .map_err(storage_err)?;
        }
        info!(channel_id = %channel_id, days, "New member grace updated");
        self.get(channel_id).await
    }
}
