//! Shared cache type aliases and counters

use serde::Serialize;
use std::fmt;

/// Namespaced key, see [`crate::cache::keys`]
pub type CacheKey = String;

/// Raw payload held by the default [`crate::cache::LocalCache`]
pub type CacheValue = Vec<u8>;

/// Counter snapshot taken by [`crate::cache::LocalCache::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Absent and expired lookups alike
    pub misses: u64,
    /// Stored entries, expired ones included
    pub entries: usize,
    pub evictions_expired: u64,
    pub evictions_overflow: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups served, `0.0` before the first lookup
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }

    pub fn evictions(&self) -> u64 {
        self.evictions_expired + self.evictions_overflow
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {}/{} hits ({:.1}%), {} evicted",
            self.entries,
            self.hits,
            self.lookups(),
            self.hit_ratio() * 100.0,
            self.evictions()
        )
    }
}
