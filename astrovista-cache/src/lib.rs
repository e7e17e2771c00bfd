//! # AstroVista cache (astrovista-cache)
//!
//! Caching and admission control for the AstroVista API.
//!
//! ## Features
//!
//! - Remote key-value tier over Redis that degrades to a no-op when Redis is
//!   absent or unreachable
//! - Bounded in-process TTL cache
//! - JSON-typed cache facade with namespaced keys
//! - Two-tier translation cache and a provider pipeline with timeouts
//! - Sliding-window rate limiter
//!
//! ## Remote tier
//!
//! Connecting never fails. Without `REDIS_URL`, or when Redis cannot be
//! reached, every read is a miss and every write is dropped.
//!
//! ```no_run
//! use astrovista_cache::{CacheFacade, RedisStore, RemoteStore, RemoteStoreConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::connect(RemoteStoreConfig::with_url("localhost:6379")).await;
//!     println!("Remote cache enabled: {}", store.is_enabled());
//!
//!     let cache = CacheFacade::new(Arc::new(store));
//!     cache.set("apod:latest", &"record", Duration::from_secs(3600)).await?;
//!     let cached: Option<String> = cache.get("apod:latest").await?;
//!     println!("Cached: {:?}", cached);
//!     Ok(())
//! }
//! ```
//!
//! ## Translation
//!
//! ```no_run
//! use astrovista_cache::{
//!     CacheFacade, MockTranslationProvider, RedisStore, TranslationCache, Translator,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let facade = CacheFacade::new(Arc::new(RedisStore::disabled()));
//!     let cache = Arc::new(TranslationCache::new(facade, Duration::from_secs(30 * 24 * 3600)));
//!     let translator = Translator::new(Arc::new(MockTranslationProvider), cache);
//!
//!     let title = translator.try_translate("Andromeda Galaxy", "pt-BR").await;
//!     println!("{}", title);
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limiting
//!
//! ```no_run
//! use astrovista_cache::{RateLimitConfig, RateLimiter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let limiter = RateLimiter::new(RateLimitConfig::default());
//!     assert!(limiter.allow("203.0.113.7").await);
//!     assert!(!limiter.allow("203.0.113.7").await);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod rate_limit;
pub mod store;
pub mod translation;

// Re-export main types for convenience
pub use cache::{
    keys, CacheEntry, CacheFacade, CacheKey, CacheStats, CacheTtls, CacheValue, LocalCache,
    LocalCacheConfig, LocalCacheConfigBuilder, Lookup, Namespace,
};
pub use error::{CacheError, Result};
pub use rate_limit::{start_idle_sweeper, RateLimitConfig, RateLimiter};
pub use store::{MemoryStore, RedisStore, RemoteStore, RemoteStoreConfig};
pub use translation::{
    sanitize_language_code, translation_key, MockTranslationProvider, TranslationCache,
    TranslationProvider, Translator,
};
