//! # API Cache Demo Service
//!
//! HTTP service whose user endpoints run through the response cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │            (/api/v1/users, /api/v1/utils)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ApiContext                             │
//! │     (CachePolicy / InvalidatePolicy over ns "users")        │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     Redis Cache         │   │      UserRepository          │
//! │  (responses, TTL 1 day) │   │   (source of truth)          │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Cached responses carry `X-API-Cache: true` on a hit and `false` on a
//! miss. When the store is unavailable the header is omitted and every
//! request reaches the repository.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;

use axum::http::{HeaderValue, Method};
use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use context::ApiContext;
pub use error::{ApiError, ApiResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Build the Axum router
pub fn build_router(ctx: ApiContext, config: &ApiConfig) -> Router {
    let origins = if config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(origins)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .nest(&config.api_prefix, routes::api_routes())
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(ctx)
}
