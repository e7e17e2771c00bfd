//! Stored values and their deadlines

use std::time::{Duration, Instant};

/// Longest TTL honoured as given
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

/// A value held by [`crate::cache::LocalCache`] until `expires`.
///
/// Overwrites replace the whole entry, so nothing here is mutated after
/// insertion.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted: Instant,
    pub expires: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        let inserted = Instant::now();
        let expires = deadline(inserted, ttl);

        Self {
            value,
            inserted,
            expires,
        }
    }

    /// Expired once `now` reaches the deadline
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// `start + ttl`, clamped to [`MAX_TTL`] when the sum does not fit the
/// platform clock
pub(crate) fn deadline(start: Instant, ttl: Duration) -> Instant {
    start
        .checked_add(ttl)
        .or_else(|| start.checked_add(MAX_TTL))
        .unwrap_or(start)
}
