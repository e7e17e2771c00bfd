//! Server configuration from the environment

use astrovista_cache::{CacheTtls, RateLimitConfig, RemoteStoreConfig};
use std::time::Duration;

/// Everything the server reads at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Token required in `X-API-Token` for writes. `None` rejects every write.
    pub internal_api_token: Option<String>,

    pub remote: RemoteStoreConfig,
    pub rate_limit: RateLimitConfig,
    pub ttls: CacheTtls,

    /// Timeout for a single translation provider call
    pub translation_timeout: Duration,

    /// Timeout for a single origin store call
    pub origin_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            internal_api_token: None,
            remote: RemoteStoreConfig::default(),
            rate_limit: RateLimitConfig::default(),
            ttls: CacheTtls::default(),
            translation_timeout: Duration::from_secs(10),
            origin_timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, keeping defaults
    /// for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_string("HOST").unwrap_or(defaults.host),
            port: env_string("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            internal_api_token: env_string("INTERNAL_API_TOKEN"),
            remote: RemoteStoreConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            ttls: CacheTtls::from_env(),
            translation_timeout: env_string("TRANSLATION_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.translation_timeout),
            origin_timeout: defaults.origin_timeout,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8081");
        assert!(config.internal_api_token.is_none());
        assert!(config.remote.url.is_none());
        assert_eq!(config.rate_limit.limit, 1);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.translation_timeout, Duration::from_secs(10));
    }
}
