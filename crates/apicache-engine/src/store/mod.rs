//! # Store Module
//!
//! Key-value backends the cache reads from and writes to, and the
//! connector that picks one at startup.
//!
//! - [`RedisStore`]: live Redis over a multiplexed connection
//! - [`MemoryStore`]: in-process substitute with the same semantics,
//!   selected under `CACHE_ENV=TEST`

pub mod connector;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use connector::{RedisStatus, StoreMode, connect, connect_with};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_client::RedisStore;

/// Operations the cache needs from its backing store.
///
/// Each operation is individually atomic; the engine never combines them
/// into transactions.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl` (whole seconds, at least one).
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All live keys starting with `prefix`, in no particular order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Remaining time to live, `None` if the key is absent or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
}

/// Store handle shared by every decorator.
pub type SharedStore = Arc<dyn CacheStore>;

/// TTL as the whole number of seconds actually applied.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds_has_floor() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(86_400)), 86_400);
    }
}
