//! Typed cache facade over the remote store

use crate::error::{CacheError, Result};
use crate::store::RemoteStore;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a read-through value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

impl Lookup {
    /// `HIT` or `MISS`, as sent in `X-Cache` headers
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Hit => "HIT",
            Lookup::Miss => "MISS",
        }
    }
}

/// JSON-typed Get/Set/Delete/Clear over a [`RemoteStore`].
///
/// The cache is optional for correctness. A disabled store yields misses
/// and silent no-op writes; other store errors come back as soft
/// [`CacheError`]s for the caller to log before going to the origin.
#[derive(Clone)]
pub struct CacheFacade {
    store: Arc<dyn RemoteStore>,
}

impl CacheFacade {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Get the underlying store
    pub fn store(&self) -> Arc<dyn RemoteStore> {
        self.store.clone()
    }

    /// Whether the remote tier is currently serving
    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    /// Fetch and decode `key`.
    ///
    /// `Ok(None)` is a miss. Bytes that do not decode into `T` are reported
    /// as [`CacheError::Deserialization`], never as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Deserialization(format!("{}: {}", key, e)))
    }

    /// Encode `value` and store it under `key` for `ttl`.
    ///
    /// Nothing is written if encoding fails.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CacheError::Serialization(format!("{}: {}", key, e)))?;

        self.store.set(key, &bytes, ttl).await
    }

    /// Remove `key`
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    /// Remove every key under `prefix`
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        self.store.delete_prefix(prefix).await
    }

    /// Remove everything
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Read-through helper: serve `key` from the cache, otherwise run
    /// `fetch`, write its result back and return it.
    ///
    /// Cache errors are logged and never fail the call; only the error from
    /// `fetch` is returned. A fetch error is not cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> std::result::Result<(T, Lookup), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit: {}", key);
                return Ok((value, Lookup::Hit));
            }
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => warn!("Cache read failed for {}, falling back to origin: {}", key, e),
        }

        let value = fetch().await?;

        if let Err(e) = self.set(key, &value, ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }

        Ok((value, Lookup::Miss))
    }

    /// Delete several keys after an origin write, logging failures.
    ///
    /// Call this only after the origin write has completed. Readers may see
    /// the old cached value until it returns.
    pub async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            match self.store.delete(key).await {
                Ok(()) => debug!("Invalidated cache key: {}", key),
                Err(e) => warn!("Failed to invalidate cache key {}: {}", key, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RedisStore};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        date: String,
        title: String,
    }

    fn record() -> Record {
        Record {
            date: "2023-01-15".to_string(),
            title: "Andromeda Galaxy".to_string(),
        }
    }

    fn memory_facade() -> CacheFacade {
        CacheFacade::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = memory_facade();
        cache
            .set("apod:date:2023-01-15", &record(), Duration::from_secs(60))
            .await
            .unwrap();

        let cached: Option<Record> = cache.get("apod:date:2023-01-15").await.unwrap();
        assert_eq!(cached, Some(record()));
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = memory_facade();
        let cached: Option<Record> = cache.get("apod:latest").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("apod:latest", b"not json", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = CacheFacade::new(store);

        let result = cache.get::<Record>("apod:latest").await;
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_encode_failure_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheFacade::new(store.clone());

        // JSON object keys must be strings
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], "value");

        let result = cache.set("bad", &bad, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = memory_facade();
        let ttl = Duration::from_secs(60);
        cache.set("a", &1u32, ttl).await.unwrap();
        cache.set("b", &2u32, ttl).await.unwrap();

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get::<u32>("a").await.unwrap(), None);
        assert_eq!(cache.get::<u32>("b").await.unwrap(), Some(2));

        cache.clear().await.unwrap();
        assert_eq!(cache.get::<u32>("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disabled_store_degrades() {
        let cache = CacheFacade::new(Arc::new(RedisStore::disabled()));
        assert!(!cache.is_enabled());

        cache.set("k", &record(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get::<Record>("k").await.unwrap(), None);
        cache.delete("k").await.unwrap();
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_or_fetch_populates_cache() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);

        for expected in [Lookup::Miss, Lookup::Hit, Lookup::Hit] {
            let value: std::result::Result<(Record, Lookup), String> = cache
                .get_or_fetch("apod:latest", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(record())
                })
                .await;
            assert_eq!(value.unwrap(), (record(), expected));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_origin_error() {
        let cache = memory_facade();

        let value: std::result::Result<(Record, Lookup), String> = cache
            .get_or_fetch("apod:latest", Duration::from_secs(60), || async {
                Err("origin unavailable".to_string())
            })
            .await;

        assert_eq!(value.unwrap_err(), "origin unavailable");
        assert_eq!(cache.get::<Record>("apod:latest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = memory_facade();
        let ttl = Duration::from_secs(60);
        cache.set("apod:latest", &record(), ttl).await.unwrap();
        cache.set("apod:date:2023-01-15", &record(), ttl).await.unwrap();

        cache
            .invalidate(&["apod:latest".to_string(), "apod:date:2023-01-15".to_string()])
            .await;

        assert!(cache.get::<Record>("apod:latest").await.unwrap().is_none());
        assert!(cache.get::<Record>("apod:date:2023-01-15").await.unwrap().is_none());
    }
}
