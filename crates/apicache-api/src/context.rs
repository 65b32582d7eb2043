//! # API Context
//!
//! Application state shared by every handler.

use std::sync::Arc;

use apicache_engine::{
    Cache, CacheConfig, CachePolicy, InvalidatePolicy, Namespace, ONE_DAY, Result,
};

use crate::repository::{InMemoryUserRepository, SharedUserRepository};

/// Namespace of every cached user response
pub const USERS_NAMESPACE: &str = "users";

/// Application context shared across all handlers
#[derive(Clone)]
pub struct ApiContext {
    /// Response cache
    pub cache: Cache,

    /// User repository
    pub users: SharedUserRepository,

    /// Read-through policy of the user endpoints
    pub users_cached: CachePolicy,

    /// Invalidation of the user endpoints
    pub users_invalidate: InvalidatePolicy,
}

impl ApiContext {
    pub fn new(cache: Cache, users: SharedUserRepository) -> Result<Self> {
        let namespace = Namespace::new(USERS_NAMESPACE)?;
        Ok(Self {
            users_cached: cache.cached(namespace.clone()).ttl(ONE_DAY),
            users_invalidate: cache.invalidating(namespace),
            cache,
            users,
        })
    }

    /// Context over an in-memory cache and an empty user table
    pub fn in_memory() -> Result<Self> {
        let cache = Cache::in_memory(register_exclusions(CacheConfig::default()))?;
        Self::new(cache, Arc::new(InMemoryUserRepository::new()))
    }
}

/// Exclude the injected resources of the handlers from cache keys.
pub fn register_exclusions(config: CacheConfig) -> CacheConfig {
    config.exclude::<SharedUserRepository>()
}
