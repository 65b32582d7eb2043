//! # Decorators
//!
//! Interceptors placed around request handlers:
//!
//! - [`CachePolicy`]: read-through caching of a result
//! - [`InvalidatePolicy`]: namespace invalidation after a successful write
//!
//! Both degrade to plain calls when the store is unavailable. Errors of the
//! wrapped operation always propagate unchanged.

pub mod cache;
pub mod invalidate;

pub use cache::{CachePolicy, CachedFn};
pub use invalidate::{InvalidatePolicy, InvalidatingFn};

/// How a cached call was served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from the store; the operation did not run.
    Hit,
    /// Computed and written to the store.
    Miss,
    /// Computed without the cache (disconnected, unkeyable or store error).
    Bypass,
}

impl CacheStatus {
    /// `Some(true)` on a hit, `Some(false)` on a miss, `None` when bypassed.
    pub const fn hit_signal(self) -> Option<bool> {
        match self {
            Self::Hit => Some(true),
            Self::Miss => Some(false),
            Self::Bypass => None,
        }
    }
}

/// Result of a cached call together with how it was served
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOutcome<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> CacheOutcome<T> {
    pub const fn hit(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Hit,
        }
    }

    pub const fn miss(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Miss,
        }
    }

    pub const fn bypass(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Bypass,
        }
    }

    pub const fn is_hit(&self) -> bool {
        matches!(self.status, CacheStatus::Hit)
    }

    pub const fn hit_signal(&self) -> Option<bool> {
        self.status.hit_signal()
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheOutcome<U> {
        CacheOutcome {
            value: f(self.value),
            status: self.status,
        }
    }
}
