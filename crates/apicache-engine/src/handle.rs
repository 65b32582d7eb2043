//! # Cache Handle
//!
//! The process-wide cache: configuration, connection status, store, key
//! deriver and codec, built once at startup and cloned into every decorator.

use std::fmt;
use std::sync::Arc;

use apicache_domain::Namespace;

use crate::codec::Codec;
use crate::config::CacheConfig;
use crate::decorator::{CachePolicy, InvalidatePolicy};
use crate::error::Result;
use crate::key::KeyDeriver;
use crate::store::{self, MemoryStore, RedisStatus, SharedStore, StoreMode};

struct Inner {
    config: CacheConfig,
    status: RedisStatus,
    store: Option<SharedStore>,
    keys: KeyDeriver,
    codec: Codec,
}

/// Shared cache handle
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

impl Cache {
    /// Validate `config` and connect to the configured store.
    ///
    /// An unreachable or misconfigured store is not an error: the handle is
    /// returned in pass-through mode and [`Cache::status`] says why.
    pub async fn init(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let (status, store) = store::connect_with(
            &config.host_url,
            config.store_mode,
            config.connect_timeout,
            config.operation_timeout,
        )
        .await;

        tracing::info!(
            status = %status,
            prefix = %config.key_prefix,
            excluded_types = config.exclusions.len(),
            "Cache initialized"
        );
        Self::from_parts(config, status, store)
    }

    /// Handle over an already connected store.
    pub fn with_store(config: CacheConfig, store: SharedStore) -> Result<Self> {
        Self::from_parts(config, RedisStatus::Connected, Some(store))
    }

    /// Handle over a fresh [`MemoryStore`].
    pub fn in_memory(config: CacheConfig) -> Result<Self> {
        let config = config.with_store_mode(StoreMode::InMemory);
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Pass-through handle that never touches a store.
    pub fn disconnected(config: CacheConfig, status: RedisStatus) -> Result<Self> {
        Self::from_parts(config, status, None)
    }

    fn from_parts(
        config: CacheConfig,
        status: RedisStatus,
        store: Option<SharedStore>,
    ) -> Result<Self> {
        config.validate()?;

        // a store is only ever used while connected
        let store = store.filter(|_| status.is_connected());
        let codec = Codec::new(config.codec.clone());
        let keys = KeyDeriver::new(
            config.key_prefix.clone(),
            config.exclusions.clone(),
            &codec,
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                status,
                store,
                keys,
                codec,
            }),
        })
    }

    pub fn status(&self) -> RedisStatus {
        self.inner.status
    }

    pub fn is_connected(&self) -> bool {
        self.inner.store.is_some()
    }

    /// The store, only while connected.
    pub fn store(&self) -> Option<&SharedStore> {
        self.inner.store.as_ref()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn keys(&self) -> &KeyDeriver {
        &self.inner.keys
    }

    pub fn codec(&self) -> &Codec {
        &self.inner.codec
    }

    pub fn hit_header(&self) -> &str {
        &self.inner.config.hit_header
    }

    /// Probe the store: the startup status if not connected, otherwise the
    /// outcome of a `PING` right now.
    pub async fn check(&self) -> RedisStatus {
        let Some(store) = self.store() else {
            return self.status();
        };
        match store.ping().await {
            Ok(()) => RedisStatus::Connected,
            Err(e) => {
                tracing::warn!(error = %e, "Cache store ping failed");
                RedisStatus::ConnError
            }
        }
    }

    /// Read-through caching under `namespace` with the default TTL.
    pub fn cached(&self, namespace: Namespace) -> CachePolicy {
        CachePolicy::new(self.clone(), namespace)
    }

    /// Namespace invalidation after successful writes.
    pub fn invalidating(&self, namespace: Namespace) -> InvalidatePolicy {
        InvalidatePolicy::new(self.clone(), namespace)
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("status", &self.inner.status)
            .field("connected", &self.is_connected())
            .field("prefix", &self.inner.config.key_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[tokio::test]
    async fn test_init_in_memory_mode() {
        let config = CacheConfig::default().with_store_mode(StoreMode::InMemory);
        let cache = Cache::init(config).await.unwrap();
        assert_eq!(cache.status(), RedisStatus::Connected);
        assert!(cache.is_connected());
        assert_eq!(cache.check().await, RedisStatus::Connected);
        assert_eq!(cache.hit_header(), "X-API-Cache");
    }

    #[tokio::test]
    async fn test_init_unreachable_store_is_pass_through() {
        let config = CacheConfig {
            host_url: "redis://127.0.0.1:1".into(),
            connect_timeout: std::time::Duration::from_millis(500),
            ..CacheConfig::default()
        };
        let cache = Cache::init(config).await.unwrap();
        assert_eq!(cache.status(), RedisStatus::ConnError);
        assert!(cache.store().is_none());
        assert_eq!(cache.check().await, RedisStatus::ConnError);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let config = CacheConfig {
            key_prefix: String::new(),
            ..CacheConfig::default()
        };
        let err = Cache::init(config).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn test_store_dropped_unless_connected() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let cache =
            Cache::from_parts(CacheConfig::default(), RedisStatus::AuthError, Some(store)).unwrap();
        assert!(!cache.is_connected());
        assert_eq!(cache.status(), RedisStatus::AuthError);
    }

    #[test]
    fn test_debug_hides_store() {
        let cache = Cache::disconnected(CacheConfig::default(), RedisStatus::ConnError).unwrap();
        let rendered = format!("{cache:?}");
        assert!(rendered.contains("ConnError"));
        assert!(rendered.contains("api-cache"));
    }
}
