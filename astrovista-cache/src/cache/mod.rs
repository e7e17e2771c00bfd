//! # Two-tier caching
//!
//! Cached records live in a remote key-value store reached through
//! [`CacheFacade`]; hot values that are expensive to recompute can also be
//! kept in an in-process [`LocalCache`].
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: every entry carries its own expiry, checked lazily on read
//! - **Bounded Memory**: the local tier never holds more than its configured capacity
//! - **Graceful Degradation**: an absent or failing remote tier turns into misses and no-op writes
//! - **Namespaced Keys**: one prefix per cached artifact, see [`keys`]
//!
//! ## Example
//!
//! ```rust
//! use astrovista_cache::cache::{keys, CacheFacade, LocalCache, LocalCacheConfig};
//! use astrovista_cache::store::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let facade = CacheFacade::new(Arc::new(MemoryStore::new()));
//! facade.set(&keys::latest_record(), &"cached record", Duration::from_secs(3600)).await?;
//!
//! if let Some(value) = facade.get::<String>(&keys::latest_record()).await? {
//!     println!("Cache hit: {}", value);
//! }
//!
//! let local: LocalCache<String> = LocalCache::new(
//!     LocalCacheConfig::builder()
//!         .capacity(1000)
//!         .default_ttl(Duration::from_secs(24 * 3600))
//!         .build(),
//! );
//! local.set("hello", "olá".to_string()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod facade;
pub mod keys;
pub mod local;
pub mod types;

pub use config::{CacheTtls, LocalCacheConfig, LocalCacheConfigBuilder};
pub use entry::CacheEntry;
pub use facade::{CacheFacade, Lookup};
pub use keys::Namespace;
pub use local::LocalCache;
pub use types::{CacheKey, CacheStats, CacheValue};
