//! Remote key-value tier
//!
//! [`RemoteStore`] is the narrow contract the cache facade consumes. The
//! production implementation is [`RedisStore`]; [`MemoryStore`] keeps the
//! same semantics in-process for tests and local development.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::{RedisStore, RemoteStoreConfig};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Persistent key-value service backing the durable cache tier.
///
/// Implementations that lose their backend must degrade instead of erroring:
/// reads become misses and writes become no-ops.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch raw bytes for `key`. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store raw bytes under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Remove `key` if present.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Remove everything in the store.
    async fn clear(&self) -> Result<()>;

    /// False once the store is running in disabled mode.
    fn is_enabled(&self) -> bool;
}
