//! # Invalidate Decorator
//!
//! Runs a write operation and, once it succeeds, deletes every entry cached
//! under the namespace. A failed operation leaves the store untouched.

use std::future::{Future, ready};

use apicache_domain::Namespace;

use crate::handle::Cache;

/// Namespace invalidation after successful writes
#[derive(Debug, Clone)]
pub struct InvalidatePolicy {
    cache: Cache,
    namespace: Namespace,
}

impl InvalidatePolicy {
    pub(crate) const fn new(cache: Cache, namespace: Namespace) -> Self {
        Self { cache, namespace }
    }

    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Run `op`, invalidating the namespace if it succeeds.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = op().await?;
        self.invalidate().await;
        Ok(value)
    }

    /// [`InvalidatePolicy::call`] for a synchronous operation.
    pub async fn call_sync<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.call(|| ready(op())).await
    }

    /// Delete every entry of the namespace now.
    ///
    /// Returns the number of deleted entries, or `None` when the store is
    /// not connected or the deletion failed.
    pub async fn invalidate(&self) -> Option<u64> {
        let store = self.cache.store()?;
        let prefix = self.cache.keys().namespace_prefix(&self.namespace);

        match store.delete_prefix(&prefix).await {
            Ok(deleted) => {
                tracing::debug!(namespace = %self.namespace, deleted, "Cache namespace invalidated");
                Some(deleted)
            }
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "Cache invalidation failed");
                None
            }
        }
    }

    /// Bind this policy to a function so every successful call invalidates.
    pub fn wrap<F>(&self, f: F) -> InvalidatingFn<F> {
        InvalidatingFn {
            policy: self.clone(),
            f,
        }
    }
}

/// A function bound to an [`InvalidatePolicy`]
#[derive(Debug, Clone)]
pub struct InvalidatingFn<F> {
    policy: InvalidatePolicy,
    f: F,
}

impl<F> InvalidatingFn<F> {
    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.policy.call(|| (self.f)(args)).await
    }
}
