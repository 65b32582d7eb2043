//! # Cache Decorator
//!
//! Read-through caching around an async operation:
//!
//! ```text
//! derive key ──► GET ──hit──► decode ──► return (Hit)
//!                 │
//!                miss ──► run op ──► encode ──► SETEX ──► return (Miss)
//! ```
//!
//! Store errors never reach the caller. A failed read runs the operation
//! without writing (Bypass); a failed write is logged and the computed value
//! is still returned. Concurrent misses on one key may both compute, the
//! last write wins.

use std::future::{Future, ready};
use std::time::Duration;

use apicache_domain::{CacheKey, FromValue, FunctionId, Namespace, ToValue};

use super::CacheOutcome;
use crate::handle::Cache;
use crate::key::{CacheArgs, CallArgs};
use crate::store::CacheStore;

enum Lookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

/// Read-through caching under one namespace
#[derive(Debug, Clone)]
pub struct CachePolicy {
    cache: Cache,
    namespace: Namespace,
    ttl: Duration,
}

impl CachePolicy {
    pub(crate) fn new(cache: Cache, namespace: Namespace) -> Self {
        let ttl = cache.config().default_ttl;
        Self {
            cache,
            namespace,
            ttl,
        }
    }

    /// Override the TTL for this call site. Sub-second values round up to one second.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub const fn time_to_live(&self) -> Duration {
        self.ttl
    }

    /// Serve `function(args)` from the cache, or run `op` and cache its result.
    pub async fn call<T, E, F, Fut>(
        &self,
        function: &FunctionId,
        args: &CallArgs,
        op: F,
    ) -> Result<CacheOutcome<T>, E>
    where
        T: ToValue + FromValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = self.cache.store() else {
            return op().await.map(CacheOutcome::bypass);
        };

        let key = match self.cache.keys().derive(&self.namespace, function, args) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(function = %function, error = %e, "Cache key derivation failed, bypassing");
                return op().await.map(CacheOutcome::bypass);
            }
        };

        match self.lookup::<T>(store.as_ref(), &key).await {
            Lookup::Hit(value) => return Ok(CacheOutcome::hit(value)),
            Lookup::Miss => {}
            Lookup::Unavailable => return op().await.map(CacheOutcome::bypass),
        }

        let value = op().await?;
        self.fill(store.as_ref(), &key, &value).await;
        Ok(CacheOutcome::miss(value))
    }

    /// [`CachePolicy::call`] for a synchronous operation.
    pub async fn call_sync<T, E, F>(
        &self,
        function: &FunctionId,
        args: &CallArgs,
        op: F,
    ) -> Result<CacheOutcome<T>, E>
    where
        T: ToValue + FromValue,
        F: FnOnce() -> Result<T, E>,
    {
        self.call(function, args, || ready(op())).await
    }

    /// Bind this policy to a function so every call goes through the cache.
    pub fn wrap<F>(&self, function: FunctionId, f: F) -> CachedFn<F> {
        CachedFn {
            policy: self.clone(),
            function,
            f,
        }
    }

    async fn lookup<T: FromValue>(&self, store: &dyn CacheStore, key: &CacheKey) -> Lookup<T> {
        let text = match store.get(key.as_str()).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                return Lookup::Miss;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, bypassing");
                return Lookup::Unavailable;
            }
        };

        match self.cache.codec().decode_value::<T>(&text) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Lookup::Hit(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry, recomputing");
                Lookup::Miss
            }
        }
    }

    async fn fill<T: ToValue>(&self, store: &dyn CacheStore, key: &CacheKey, value: &T) {
        let text = match self.cache.codec().encode_exact(&value.to_value()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Result not cacheable");
                return;
            }
        };

        if let Err(e) = store.set_ex(key.as_str(), &text, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

/// A function bound to a [`CachePolicy`]
#[derive(Debug, Clone)]
pub struct CachedFn<F> {
    policy: CachePolicy,
    function: FunctionId,
    f: F,
}

impl<F> CachedFn<F> {
    pub const fn function(&self) -> &FunctionId {
        &self.function
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<CacheOutcome<T>, E>
    where
        A: CacheArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: ToValue + FromValue,
    {
        let call_args = args.call_args();
        self.policy
            .call(&self.function, &call_args, || (self.f)(args))
            .await
    }
}
