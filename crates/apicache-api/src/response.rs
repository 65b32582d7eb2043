//! JSON response carrying the cache-hit header.

use apicache_engine::CacheOutcome;
use axum::Json;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A handler result served through the cache.
///
/// Renders the value as JSON and sets the hit header to `true` or `false`.
/// The header is left out when the cache was bypassed.
#[derive(Debug)]
pub struct CachedResponse<T> {
    outcome: CacheOutcome<T>,
    header: String,
}

impl<T> CachedResponse<T> {
    pub fn new(outcome: CacheOutcome<T>, header: impl Into<String>) -> Self {
        Self {
            outcome,
            header: header.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for CachedResponse<T> {
    fn into_response(self) -> Response {
        let signal = self.outcome.hit_signal();
        let mut response = Json(self.outcome.value).into_response();

        if let Some(hit) = signal {
            match HeaderName::try_from(self.header.as_str()) {
                Ok(name) => {
                    let value = HeaderValue::from_static(if hit { "true" } else { "false" });
                    response.headers_mut().insert(name, value);
                }
                Err(e) => tracing::warn!(header = %self.header, error = %e, "Invalid cache header name"),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_follows_outcome() {
        let hit = CachedResponse::new(CacheOutcome::hit(1), "X-API-Cache").into_response();
        assert_eq!(hit.headers()["x-api-cache"], "true");

        let miss = CachedResponse::new(CacheOutcome::miss(1), "X-API-Cache").into_response();
        assert_eq!(miss.headers()["x-api-cache"], "false");

        let bypass = CachedResponse::new(CacheOutcome::bypass(1), "X-API-Cache").into_response();
        assert!(bypass.headers().get("x-api-cache").is_none());
    }
}
