//! # API Configuration
//!
//! Environment-based configuration for the demo HTTP service.

use std::env;
use std::net::SocketAddr;

use apicache_engine::CacheConfig;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Path prefix of the versioned routes
    pub api_prefix: String,

    /// Logging level
    pub log_level: String,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,

    /// Response cache configuration
    pub cache: CacheConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let server_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SERVER_ADDR: {e}"))?;

        Ok(Self {
            server_addr,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            cache: CacheConfig::from_env(),
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_prefix: "/api/v1".to_string(),
            log_level: "info".to_string(),
            cors_origins: vec!["*".to_string()],
            cache: CacheConfig::default(),
        }
    }
}
