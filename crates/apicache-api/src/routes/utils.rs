//! Operational endpoints.

use apicache_engine::RedisStatus;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::context::ApiContext;

pub fn router() -> Router<ApiContext> {
    Router::new().route("/test-redis", get(test_redis))
}

/// Body of `GET /utils/test-redis`
#[derive(Debug, Serialize)]
pub struct RedisCheck {
    pub status: RedisStatus,
    pub msg: String,
}

/// `GET /utils/test-redis`: probe the cache store.
pub async fn test_redis(State(ctx): State<ApiContext>) -> Json<RedisCheck> {
    let status = ctx.cache.check().await;
    let msg = if status.is_connected() {
        "Redis connection works.".to_string()
    } else {
        format!("ERROR: {status}")
    };
    Json(RedisCheck { status, msg })
}
