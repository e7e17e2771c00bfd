//! Two-tier translation cache

use crate::cache::{keys, CacheFacade, LocalCache, LocalCacheConfig};
use std::time::Duration;
use tracing::{debug, warn};

/// Translated text cached durably in the remote tier and locally in memory.
///
/// Reads consult the remote tier first and fall back to the local one on a
/// miss or a soft failure. A remote hit is returned as is, without being
/// copied into the local tier. Writes go to both; a failed remote write is
/// logged and the local write still happens.
pub struct TranslationCache {
    facade: CacheFacade,
    local: LocalCache<String>,
    durable_ttl: Duration,
}

impl TranslationCache {
    /// Cache with the default local tier (1000 entries, 24h)
    pub fn new(facade: CacheFacade, durable_ttl: Duration) -> Self {
        Self::with_local_config(facade, LocalCacheConfig::default(), durable_ttl)
    }

    pub fn with_local_config(
        facade: CacheFacade,
        local_config: LocalCacheConfig,
        durable_ttl: Duration,
    ) -> Self {
        Self {
            facade,
            local: LocalCache::new(local_config),
            durable_ttl,
        }
    }

    /// Look up a translation by the key from
    /// [`translation_key`](crate::translation::translation_key)
    pub async fn get(&self, key: &str) -> Option<String> {
        let durable_key = keys::translation(key);

        match self.facade.get::<String>(&durable_key).await {
            Ok(Some(text)) => {
                debug!("Translation cache hit (remote): {}", key);
                return Some(text);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read translation {} from remote cache: {}", key, e),
        }

        self.local.get(key).await
    }

    /// Store a translation in both tiers
    pub async fn set(&self, key: &str, text: &str) {
        let durable_key = keys::translation(key);

        if let Err(e) = self.facade.set(&durable_key, text, self.durable_ttl).await {
            warn!("Failed to store translation {} in remote cache: {}", key, e);
        }

        self.local.set(key, text.to_string()).await;
    }

    /// Drop every cached translation from both tiers
    pub async fn clear(&self) {
        debug!("Clearing local translations: {}", self.local.stats().await);
        self.local.clear().await;

        match self.facade.delete_prefix(keys::TRANSLATION_PREFIX).await {
            Ok(removed) => debug!("Removed {} translations from remote cache", removed),
            Err(e) => warn!("Failed to clear translations from remote cache: {}", e),
        }
    }

    /// The in-process tier
    pub fn local(&self) -> &LocalCache<String> {
        &self.local
    }
}
