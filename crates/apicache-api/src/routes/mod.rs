//! # Routes
//!
//! HTTP handlers, grouped by resource.

pub mod users;
pub mod utils;

use axum::Router;

use crate::context::ApiContext;

/// Versioned API routes, to be nested under the API prefix
pub fn api_routes() -> Router<ApiContext> {
    Router::new()
        .nest("/users", users::router())
        .nest("/utils", utils::router())
}
