//! # Cache Configuration
//!
//! Immutable settings a [`Cache`](crate::Cache) is built from. Everything
//! except the excluded argument types can come from the environment.

use std::env;
use std::time::Duration;

use crate::codec::CodecOptions;
use crate::error::{CacheError, Result};
use crate::key::ExclusionPolicy;
use crate::store::StoreMode;
use crate::store::connector::DEFAULT_TIMEOUT;

// =============================================================================
// TTL CONSTANTS
// =============================================================================

pub const ONE_HOUR: Duration = Duration::from_secs(60 * 60);
pub const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const ONE_WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const ONE_MONTH: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "api-cache";
pub const DEFAULT_HIT_HEADER: &str = "X-API-Cache";

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL, `redis://[:password@]host:port[/db]`
    pub host_url: String,

    /// Global prefix of every key
    pub key_prefix: String,

    /// Response header carrying the hit signal
    pub hit_header: String,

    /// Argument types left out of key derivation
    pub exclusions: ExclusionPolicy,

    /// TTL used when a call site sets none
    pub default_ttl: Duration,

    pub connect_timeout: Duration,

    /// Bound on each individual store operation
    pub operation_timeout: Duration,

    pub store_mode: StoreMode,

    pub codec: CodecOptions,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            hit_header: DEFAULT_HIT_HEADER.to_string(),
            exclusions: ExclusionPolicy::new(),
            default_ttl: ONE_DAY,
            connect_timeout: DEFAULT_TIMEOUT,
            operation_timeout: DEFAULT_TIMEOUT,
            store_mode: StoreMode::Live,
            codec: CodecOptions::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let timeout = env::var("REDIS_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Self {
            host_url: env::var("REDIS_URL").unwrap_or_else(|_| {
                redis_url_from_parts(
                    env::var("REDIS_SERVER").ok().as_deref(),
                    env::var("REDIS_PORT").ok().as_deref(),
                    env::var("REDIS_PASSWORD").ok().as_deref(),
                )
            }),

            key_prefix: env::var("CACHE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),

            hit_header: env::var("CACHE_HIT_HEADER")
                .unwrap_or_else(|_| DEFAULT_HIT_HEADER.to_string()),

            default_ttl: env::var("CACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(ONE_DAY, Duration::from_secs),

            connect_timeout: timeout,
            operation_timeout: timeout,
            store_mode: StoreMode::from_env(),
            ..Self::default()
        }
    }

    /// Leave arguments of type `T` out of every cache key.
    #[must_use]
    pub fn exclude<T: ?Sized + 'static>(mut self) -> Self {
        self.exclusions.insert::<T>();
        self
    }

    #[must_use]
    pub fn with_store_mode(mut self, mode: StoreMode) -> Self {
        self.store_mode = mode;
        self
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Reject settings that would produce ambiguous keys or unusable timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.is_empty() {
            return Err(CacheError::InvalidConfig("key prefix must not be empty".into()));
        }
        if self.key_prefix.contains(':') {
            return Err(CacheError::InvalidConfig(format!(
                "key prefix '{}' must not contain ':'",
                self.key_prefix
            )));
        }
        if self.hit_header.is_empty() {
            return Err(CacheError::InvalidConfig("hit header must not be empty".into()));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::InvalidConfig("default TTL must be positive".into()));
        }
        if self.operation_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(CacheError::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }
}

/// `redis://[:password@]server:port` from individually configured parts.
fn redis_url_from_parts(server: Option<&str>, port: Option<&str>, password: Option<&str>) -> String {
    let server = server.unwrap_or("127.0.0.1");
    let port = port.unwrap_or("6379");
    match password {
        Some(pw) if !pw.is_empty() => format!("redis://:{pw}@{server}:{port}"),
        _ => format!("redis://{server}:{port}"),
    }
}
