use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use idlewatch_core::{validate_days, ChannelConfig, ChannelId, EffectiveConfig, IdleWatchError};

/// Per-channel thresholds, resolved field by field against global defaults.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The global defaults this store falls back to.
    fn defaults(&self) -> EffectiveConfig;

    /// Effective thresholds for a channel.
    async fn get(&self, channel_id: ChannelId) -> Result<EffectiveConfig, IdleWatchError> {
        let defaults = self.defaults();
        Ok(self
            .get_explicit(channel_id)
            .await?
            .map(|cfg| cfg.resolve(&defaults))
            .unwrap_or(defaults))
    }

    /// The stored overrides, if the channel was ever configured.
    async fn get_explicit(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelConfig>, IdleWatchError>;

    /// Set the inactivity threshold; the grace field keeps its current effective value.
    async fn set_inactivity_threshold(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError>;

    /// Set the new-member grace; the threshold field keeps its current effective value.
    async fn set_new_member_grace(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError>;
}

/// Config store kept in process memory. Used by tests and dry runs.
pub struct InMemoryConfigStore {
    defaults: EffectiveConfig,
    configs: RwLock<HashMap<ChannelId, ChannelConfig>>,
}

impl InMemoryConfigStore {
    pub fn new(defaults: EffectiveConfig) -> Self {
        Self {
            defaults,
            configs: RwLock::new(HashMap::new()),
        }
    }

    async fn update(
        &self,
        channel_id: ChannelId,
        apply: impl FnOnce(&mut ChannelConfig) + Send,
    ) -> EffectiveConfig {
        let mut configs = self.configs.write().await;
        let defaults = self.defaults;
        let cfg = configs.entry(channel_id).or_insert_with(|| ChannelConfig {
            channel_id,
            inactivity_threshold_days: None,
            new_member_grace_days: None,
        });
        // Freeze the untouched field at its effective value.
        cfg.inactivity_threshold_days
            .get_or_insert(defaults.inactivity_threshold_days);
        cfg.new_member_grace_days
            .get_or_insert(defaults.new_member_grace_days);
        apply(cfg);
        cfg.resolve(&defaults)
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new(EffectiveConfig::default())
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    fn defaults(&self) -> EffectiveConfig {
        self.defaults
    }

    async fn get_explicit(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelConfig>, IdleWatchError> {
        Ok(self.configs.read().await.get(&channel_id).cloned())
    }

    async fn set_inactivity_threshold(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError> {
        let days = validate_days(days)?;
        Ok(self
            .update(channel_id, move |cfg| cfg.inactivity_threshold_days = Some(days))
            .await)
    }

    async fn set_new_member_grace(
        &self,
        channel_id: ChannelId,
        days: i64,
    ) -> Result<EffectiveConfig, IdleWatchError> {
        let days = validate_days(days)?;
        Ok(self
            .update(channel_id, move |cfg| cfg.new_member_grace_days = Some(days))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ChannelId = ChannelId(-42);

    #[tokio::test]
    async fn test_defaults_when_unconfigured() {
        let store = InMemoryConfigStore::default();
        assert_eq!(store.get(CHAT).await.unwrap(), EffectiveConfig::default());
        assert!(store.get_explicit(CHAT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_setters_preserve_other_field() {
        let store = InMemoryConfigStore::default();
        store.set_new_member_grace(CHAT, 5).await.unwrap();
        let eff = store.set_inactivity_threshold(CHAT, 7).await.unwrap();
        assert_eq!(eff.inactivity_threshold_days, 7);
        assert_eq!(eff.new_member_grace_days, 5);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_without_writing() {
        let store = InMemoryConfigStore::default();
        let err = store.set_inactivity_threshold(CHAT, 0).await.unwrap_err();
        assert!(matches!(err, IdleWatchError::InvalidConfig(_)));
        assert!(store.set_new_member_grace(CHAT, -1).await.is_err());
        assert!(store.get_explicit(CHAT).await.unwrap().is_none());
    }
}
