//! # API Cache Engine
//!
//! Read-through response caching for service endpoints, with namespace
//! invalidation on writes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Request Handlers                        │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                       │
//!                    ▼                       ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │       CachePolicy        │   │      InvalidatePolicy        │
//! │  (read-through, TTL)     │   │  (delete namespace on Ok)    │
//! └──────────────────────────┘   └──────────────────────────────┘
//!          │            │                    │
//!          ▼            ▼                    │
//! ┌──────────────┐ ┌──────────┐              │
//! │  KeyDeriver  │ │  Codec   │              │
//! │ (exclusions) │ │ (tagged) │              │
//! └──────────────┘ └──────────┘              │
//!          │            │                    │
//!          ▼            ▼                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CacheStore (Redis | in-memory)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys look like `api-cache:users:app::users::read_user:<sha256>`. Every
//! key of a namespace shares the prefix `api-cache:users:`, which is what
//! invalidation deletes.
//!
//! ## Features
//!
//! - `redis`: Redis backend (default). Without it only the in-memory store
//!   is available.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apicache_engine::{Cache, CacheConfig, CallArgs, Namespace, function_id};
//!
//! let cache = Cache::init(CacheConfig::from_env().exclude::<DbPool>()).await?;
//! let users = Namespace::new("users")?;
//!
//! let outcome = cache
//!     .cached(users.clone())
//!     .call(
//!         &function_id!(read_user),
//!         &CallArgs::new().resource(&pool).kwarg("user_id", &user_id),
//!         || repo.find(user_id),
//!     )
//!     .await?;
//!
//! cache.invalidating(users).call(|| repo.update(user)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod config;
pub mod decorator;
pub mod error;
pub mod handle;
pub mod key;
pub mod store;

// Re-export commonly used types
pub use apicache_domain::{
    CacheKey, FromValue, FunctionId, Namespace, RecordReader, ToValue, Value, function_id,
    value_enum,
};
pub use codec::{Codec, CodecOptions, CodecRegistry, TypeCodec};
pub use config::{CacheConfig, ONE_DAY, ONE_HOUR, ONE_MONTH, ONE_WEEK, ONE_YEAR};
pub use decorator::{
    CacheOutcome, CachePolicy, CacheStatus, CachedFn, InvalidatePolicy, InvalidatingFn,
};
pub use error::{CacheError, CodecError, Result};
pub use handle::Cache;
pub use key::{CacheArgs, CallArgs, ExclusionPolicy, KeyDeriver};
pub use store::{CacheStore, MemoryStore, RedisStatus, SharedStore, StoreMode};

#[cfg(feature = "redis")]
pub use store::RedisStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_through_public_api() {
        let cache = Cache::in_memory(CacheConfig::default()).unwrap();
        let ns = Namespace::new("reports").unwrap();
        let args = CallArgs::new().arg(&2024_i32);

        for expected in [CacheStatus::Miss, CacheStatus::Hit] {
            let outcome = cache
                .cached(ns.clone())
                .call_sync(&function_id!(yearly_totals), &args, || {
                    Ok::<_, CacheError>(vec![1_u64, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(outcome.status, expected);
            assert_eq!(outcome.value, vec![1, 2, 3]);
        }
    }
}
