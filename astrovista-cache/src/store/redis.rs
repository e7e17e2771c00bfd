//! Redis-backed remote store with degrade-to-noop behaviour
//!
//! The adapter never propagates connectivity problems. If Redis is not
//! configured, cannot be reached at startup, or drops the connection later,
//! the store switches to disabled mode: reads miss, writes succeed without
//! doing anything, and a single warning is logged.

use super::RemoteStore;
use crate::error::{CacheError, Result};
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, IntoConnectionInfo, RedisError, RedisResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for the remote store
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Redis address, either a full `redis://` URL or `host:port`.
    /// `None` runs the store in disabled mode.
    pub url: Option<String>,
    /// Optional password applied on top of the URL
    pub password: Option<String>,
    /// Timeout for the initial connect and PING
    pub connect_timeout: Duration,
    /// Timeout for every individual operation
    pub operation_timeout: Duration,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            password: None,
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
        }
    }
}

impl RemoteStoreConfig {
    /// Create a config pointing at `url`
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Read `REDIS_URL`, `REDIS_PASSWORD`, `REDIS_CONNECT_TIMEOUT_SECS` and
    /// `REDIS_OPERATION_TIMEOUT_SECS`. Empty values count as unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: non_empty_env("REDIS_URL"),
            password: non_empty_env("REDIS_PASSWORD"),
            connect_timeout: env_secs("REDIS_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
            operation_timeout: env_secs("REDIS_OPERATION_TIMEOUT_SECS")
                .unwrap_or(defaults.operation_timeout),
        }
    }

    /// Normalise the configured address into a `redis://` URL
    pub fn normalized_url(&self) -> Option<String> {
        self.url.as_ref().map(|url| {
            if url.contains("://") {
                url.clone()
            } else {
                format!("redis://{}", url)
            }
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    non_empty_env(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Remote store backed by a multiplexed Redis connection
pub struct RedisStore {
    conn: Option<MultiplexedConnection>,
    disabled: AtomicBool,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis. Never fails: any problem puts the store into
    /// disabled mode and the service keeps running without a remote tier.
    pub async fn connect(config: RemoteStoreConfig) -> Self {
        let Some(url) = config.normalized_url() else {
            info!("No remote cache configured, caching through Redis is disabled");
            return Self::disabled_with_timeout(config.operation_timeout);
        };

        match Self::open(&url, config.password.as_deref(), config.connect_timeout).await {
            Ok(conn) => {
                info!("Connected to remote cache at {}", redact(&url));
                Self {
                    conn: Some(conn),
                    disabled: AtomicBool::new(false),
                    operation_timeout: config.operation_timeout,
                }
            }
            Err(e) => {
                warn!(
                    "Could not connect to remote cache at {}: {}. \
                     Caching is disabled, requests are served from the origin store",
                    redact(&url),
                    e
                );
                Self::disabled_with_timeout(config.operation_timeout)
            }
        }
    }

    /// A store that is disabled from the start
    pub fn disabled() -> Self {
        Self::disabled_with_timeout(RemoteStoreConfig::default().operation_timeout)
    }

    fn disabled_with_timeout(operation_timeout: Duration) -> Self {
        Self {
            conn: None,
            disabled: AtomicBool::new(true),
            operation_timeout,
        }
    }

    async fn open(
        url: &str,
        password: Option<&str>,
        connect_timeout: Duration,
    ) -> std::result::Result<MultiplexedConnection, String> {
        let mut info = url.into_connection_info().map_err(|e| e.to_string())?;
        if let Some(password) = password {
            info.redis.password = Some(password.to_string());
        }
        let client = Client::open(info).map_err(|e| e.to_string())?;

        let connect = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisError>(conn)
        };

        match tokio::time::timeout(connect_timeout, connect).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("connect timed out after {:?}", connect_timeout)),
        }
    }

    /// Switch to disabled mode, logging only on the first detection
    fn disable(&self, reason: &RedisError) {
        if !self.disabled.swap(true, Ordering::SeqCst) {
            warn!(
                "Remote cache became unavailable: {}. \
                 Caching is disabled for the rest of the process lifetime",
                reason
            );
        }
    }

    /// The connection to use, or `None` in disabled mode
    fn connection(&self) -> Option<MultiplexedConnection> {
        if self.disabled.load(Ordering::SeqCst) {
            return None;
        }
        self.conn.clone()
    }

    /// Run a Redis operation under the operation timeout.
    ///
    /// Connectivity failures disable the store and resolve to `Ok(None)`;
    /// the caller maps that to its no-op result.
    async fn run<T, F>(&self, context: &str, op: F) -> Result<Option<T>>
    where
        F: Future<Output = std::result::Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) if is_unavailable(&e) => {
                self.disable(&e);
                Ok(None)
            }
            Ok(Err(e)) => Err(CacheError::Remote(format!("{}: {}", context, e))),
            Err(_) => Err(CacheError::Timeout {
                timeout_ms: self.operation_timeout.as_millis() as u64,
                context: context.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(mut conn) = self.connection() else {
            return Ok(None);
        };
        let value: Option<Option<Vec<u8>>> = self
            .run(&format!("GET {}", key), async move { conn.get(key).await })
            .await?;
        let value = value.flatten();
        if value.is_some() {
            debug!("Remote cache hit: {}", key);
        } else {
            debug!("Remote cache miss: {}", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let Some(mut conn) = self.connection() else {
            return Ok(());
        };
        let millis = (ttl.as_millis() as u64).max(1);
        self.run(&format!("PSETEX {}", key), async move {
            conn.pset_ex::<_, _, ()>(key, value, millis).await
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let Some(mut conn) = self.connection() else {
            return Ok(());
        };
        self.run(&format!("DEL {}", key), async move {
            conn.del::<_, i64>(key).await
        })
        .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let Some(conn) = self.connection() else {
            return Ok(0);
        };
        let pattern = format!("{}*", prefix);
        let deleted = self
            .run(&format!("KEYS {}", pattern), delete_matching(conn, pattern.clone()))
            .await?;
        Ok(deleted.unwrap_or(0).max(0) as usize)
    }

    async fn clear(&self) -> Result<()> {
        let Some(conn) = self.connection() else {
            return Ok(());
        };
        self.run("FLUSHDB", flush_db(conn)).await?;
        info!("Flushed remote cache");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }
}

/// KEYS + DEL for a glob pattern
async fn delete_matching(mut conn: MultiplexedConnection, pattern: String) -> RedisResult<i64> {
    let keys: Vec<String> = conn.keys(&pattern).await?;
    if keys.is_empty() {
        return Ok(0);
    }
    conn.del(&keys).await
}

async fn flush_db(mut conn: MultiplexedConnection) -> RedisResult<()> {
    ::redis::cmd("FLUSHDB").query_async(&mut conn).await
}

/// Errors that mean the backend is gone rather than that a command failed
fn is_unavailable(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped()
}

/// Hide credentials embedded in a URL before logging it
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
