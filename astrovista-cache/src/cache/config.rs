//! Configuration for the cache tiers

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the in-process [`LocalCache`](crate::cache::LocalCache)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheConfig {
    /// Maximum number of entries before cleanup kicks in
    pub capacity: usize,

    /// Time-to-live applied when the caller does not pass one
    pub default_ttl: Duration,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            // 24 hours
            default_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl LocalCacheConfig {
    /// Create a new builder for local cache configuration
    pub fn builder() -> LocalCacheConfigBuilder {
        LocalCacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::Config(
                "capacity must be greater than 0".to_string(),
            ));
        }

        if self.default_ttl.is_zero() {
            return Err(CacheError::Config(
                "default_ttl must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Replace out-of-range values with the defaults
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            capacity: if self.capacity == 0 {
                defaults.capacity
            } else {
                self.capacity
            },
            default_ttl: if self.default_ttl.is_zero() {
                defaults.default_ttl
            } else {
                self.default_ttl
            },
        }
    }

    /// Number of extra entries evicted when expiry alone does not free room
    pub fn overflow_batch(&self) -> usize {
        (self.capacity / 4).max(1)
    }
}

/// Builder for local cache configuration
#[derive(Debug, Default)]
pub struct LocalCacheConfigBuilder {
    capacity: Option<usize>,
    default_ttl: Option<Duration>,
}

impl LocalCacheConfigBuilder {
    /// Set maximum number of entries
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set default TTL for entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Build the configuration
    pub fn build(self) -> LocalCacheConfig {
        let defaults = LocalCacheConfig::default();

        LocalCacheConfig {
            capacity: self.capacity.unwrap_or(defaults.capacity),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
        }
    }
}

/// TTLs per cached artifact
///
/// Records by date never change once published, so they are kept much longer
/// than the "latest" pointer or search pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtls {
    /// `apod:latest`
    pub latest: Duration,
    /// `apod:date:*`
    pub record: Duration,
    /// `apods:range:*`
    pub date_range: Duration,
    /// `search:*`
    pub search: Duration,
    /// `translation:*` in the durable tier
    pub translation: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            latest: Duration::from_secs(3600),
            record: Duration::from_secs(30 * 24 * 3600),
            date_range: Duration::from_secs(12 * 3600),
            search: Duration::from_secs(300),
            translation: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

impl CacheTtls {
    /// Read `CACHE_TTL_{LATEST,RECORD,RANGE,SEARCH,TRANSLATION}_SECS`,
    /// keeping defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |name: &str, fallback: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            latest: secs("CACHE_TTL_LATEST_SECS", defaults.latest),
            record: secs("CACHE_TTL_RECORD_SECS", defaults.record),
            date_range: secs("CACHE_TTL_RANGE_SECS", defaults.date_range),
            search: secs("CACHE_TTL_SEARCH_SECS", defaults.search),
            translation: secs("CACHE_TTL_TRANSLATION_SECS", defaults.translation),
        }
    }
}
