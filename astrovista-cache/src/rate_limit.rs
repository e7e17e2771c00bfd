//! Sliding-window rate limiting
//!
//! Each client key keeps the instants of its admitted requests. A request is
//! admitted while fewer than `limit` of them fall inside the trailing
//! window. State is per process and is lost on restart.

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Limits for a [`RateLimiter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub limit: usize,

    /// Length of the trailing window
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 1,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Read `RATE_LIMIT_REQUESTS` and `RATE_LIMIT_WINDOW_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parse = |name: &str| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        Self {
            limit: parse("RATE_LIMIT_REQUESTS")
                .map(|v| v as usize)
                .unwrap_or(defaults.limit),
            window: parse("RATE_LIMIT_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(CacheError::Config("rate limit must be greater than 0".to_string()));
        }
        if self.window.is_zero() {
            return Err(CacheError::Config("rate limit window must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Per-key sliding-window limiter.
///
/// One mutex guards every window. The critical section is a prune and a
/// push, so contention stays low for a single write endpoint.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            "Rate limiter: {} request(s) per {:?}",
            config.limit, config.window
        );

        Self {
            windows: Mutex::new(HashMap::new()),
            limit: config.limit,
            window: config.window,
        }
    }

    /// Admit or deny a request from `client_key` arriving now
    pub async fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now()).await
    }

    /// Admit or deny a request from `client_key` arriving at `now`.
    ///
    /// A denied request is not recorded, so it does not extend the window.
    pub async fn allow_at(&self, client_key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        let timestamps = windows.entry(client_key.to_string()).or_default();

        prune(timestamps, now, self.window);

        if timestamps.len() >= self.limit {
            debug!("Rate limit exceeded for {}", client_key);
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// How long a denied client is told to wait
    pub fn retry_after(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop keys with no admitted request inside the window, returning how
    /// many were removed
    pub async fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now()).await
    }

    pub async fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();

        windows.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });

        before - windows.len()
    }

    /// Number of client keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// Drop timestamps at or before `now - window`
fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    let Some(window_start) = now.checked_sub(window) else {
        return;
    };

    while let Some(&oldest) = timestamps.front() {
        if oldest > window_start {
            break;
        }
        timestamps.pop_front();
    }
}

/// Background task sweeping idle rate-limit windows
pub async fn start_idle_sweeper(limiter: Arc<RateLimiter>, interval: Duration) {
    info!("Starting rate limiter sweep task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let removed = limiter.sweep_idle().await;
        if removed > 0 {
            debug!("Rate limiter sweep: {} idle keys removed", removed);
        }
    }
}
