//! Bounded in-process cache with lazy expiry

use crate::cache::{
    config::LocalCacheConfig,
    entry::CacheEntry,
    types::{CacheKey, CacheStats, CacheValue},
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// In-process TTL cache with a hard entry bound.
///
/// - Reads take the read lock only. An expired entry is reported as a miss
///   and left in place until the next cleanup.
/// - Cleanup runs inside `set` when the cache is full and the key is new:
///   expired entries go first; if that is not enough, the oldest insertions
///   are evicted in a batch of a quarter of the capacity.
/// - One lock guards the whole map.
pub struct LocalCache<V = CacheValue> {
    config: LocalCacheConfig,
    store: RwLock<LocalStore<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions_expired: AtomicU64,
    evictions_overflow: AtomicU64,
}

struct LocalStore<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,

    /// Keys from oldest to newest insertion
    insertion_order: VecDeque<CacheKey>,
}

impl<V: Clone> LocalCache<V> {
    /// Create a new cache with the given configuration.
    ///
    /// An invalid configuration is logged and its bad values replaced by the
    /// defaults.
    pub fn new(config: LocalCacheConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid local cache configuration ({}), using defaults", e);
                config.normalized()
            }
        };

        debug!(
            "Initializing local cache (capacity: {}, default ttl: {:?})",
            config.capacity, config.default_ttl
        );

        Self {
            config,
            store: RwLock::new(LocalStore {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions_expired: AtomicU64::new(0),
            evictions_overflow: AtomicU64::new(0),
        }
    }

    /// Create a cache holding at most `capacity` entries with the default TTL
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(LocalCacheConfig::builder().capacity(capacity).build())
    }

    pub fn config(&self) -> &LocalCacheConfig {
        &self.config
    }

    /// Get a value; `None` for both absent and expired keys
    pub async fn get(&self, key: &str) -> Option<V> {
        let store = self.store.read().await;

        match store.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Local cache hit: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Local cache entry expired: {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Local cache miss: {}", key);
                None
            }
        }
    }

    /// Insert a value with the configured default TTL
    pub async fn set(&self, key: impl Into<CacheKey>, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    /// Insert a value expiring `ttl` from now, replacing any previous entry
    pub async fn set_with_ttl(&self, key: impl Into<CacheKey>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry::new(value, ttl);

        let mut store = self.store.write().await;

        if store.entries.contains_key(&key) {
            store.insertion_order.retain(|k| k != &key);
        } else if store.entries.len() >= self.config.capacity {
            self.cleanup_locked(&mut store);
        }

        store.insertion_order.push_back(key.clone());
        store.entries.insert(key, entry);
    }

    /// Remove a single entry, returning its value if it was present
    pub async fn remove(&self, key: &str) -> Option<V> {
        let mut store = self.store.write().await;
        let entry = store.entries.remove(key)?;
        store.insertion_order.retain(|k| k != key);
        Some(entry.value)
    }

    /// Remove all entries
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        let count = store.entries.len();
        store.entries.clear();
        store.insertion_order.clear();
        debug!("Cleared {} entries from local cache", count);
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;
        self.remove_expired_locked(&mut store)
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Snapshot of the cache counters
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len().await,
            evictions_expired: self.evictions_expired.load(Ordering::Relaxed),
            evictions_overflow: self.evictions_overflow.load(Ordering::Relaxed),
        }
    }

    /// Caller holds the write lock
    fn cleanup_locked(&self, store: &mut LocalStore<V>) {
        self.remove_expired_locked(store);

        if store.entries.len() < self.config.capacity {
            return;
        }

        let batch = self.config.overflow_batch();
        let mut evicted = 0;
        while evicted < batch {
            let Some(key) = store.insertion_order.pop_front() else {
                break;
            };
            if store.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }

        self.evictions_overflow
            .fetch_add(evicted as u64, Ordering::Relaxed);
        debug!("Evicted {} oldest entries from full local cache", evicted);
    }

    fn remove_expired_locked(&self, store: &mut LocalStore<V>) -> usize {
        let now = Instant::now();
        let before = store.entries.len();

        store.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - store.entries.len();

        if removed > 0 {
            let entries = &store.entries;
            store.insertion_order.retain(|k| entries.contains_key(k));
            self.evictions_expired
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Cleaned up {} expired local cache entries", removed);
        }

        removed
    }
}

impl<V: Clone> Default for LocalCache<V> {
    fn default() -> Self {
        Self::new(LocalCacheConfig::default())
    }
}
