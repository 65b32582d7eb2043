//! User endpoints.
//!
//! Reads are served through the `users` cache namespace; every successful
//! write invalidates it.

use apicache_engine::{CallArgs, function_id};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::context::ApiContext;
use crate::error::{ApiError, ApiResult};
use crate::models::{Pagination, User, UserCreate, UserUpdate};
use crate::response::CachedResponse;

pub fn router() -> Router<ApiContext> {
    Router::new()
        .route("/", get(read_users).post(create_user))
        .route("/{user_id}", get(read_user_by_id).put(update_user))
}

/// `GET /users?skip&limit`
pub async fn read_users(
    State(ctx): State<ApiContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<CachedResponse<Vec<User>>> {
    let args = CallArgs::new()
        .resource(&ctx.users)
        .kwarg("skip", &page.skip)
        .kwarg("limit", &page.limit);

    let outcome = ctx
        .users_cached
        .call(&function_id!(read_users), &args, || list_users(&ctx, page))
        .await?;

    Ok(CachedResponse::new(outcome, ctx.cache.hit_header()))
}

/// `GET /users/{user_id}`
pub async fn read_user_by_id(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<i64>,
) -> ApiResult<CachedResponse<User>> {
    let args = CallArgs::new()
        .resource(&ctx.users)
        .kwarg("user_id", &user_id);

    let outcome = ctx
        .users_cached
        .call(&function_id!(read_user_by_id), &args, || find_user(&ctx, user_id))
        .await?;

    Ok(CachedResponse::new(outcome, ctx.cache.hit_header()))
}

/// `POST /users`
pub async fn create_user(
    State(ctx): State<ApiContext>,
    Json(input): Json<UserCreate>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !input.email.contains('@') {
        return Err(ApiError::InvalidInput(format!(
            "'{}' is not an email address",
            input.email
        )));
    }

    let user = ctx
        .users_invalidate
        .call(|| register_user(&ctx, input))
        .await?;

    tracing::info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /users/{user_id}`
pub async fn update_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<i64>,
    Json(input): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    let user = ctx
        .users_invalidate
        .call(|| async { ctx.users.update(user_id, input).await })
        .await?;

    tracing::info!(user_id = user.id, "User updated");
    Ok(Json(user))
}

async fn list_users(ctx: &ApiContext, page: Pagination) -> ApiResult<Vec<User>> {
    Ok(ctx.users.list(page).await?)
}

async fn find_user(ctx: &ApiContext, user_id: i64) -> ApiResult<User> {
    ctx.users
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(user_id))
}

async fn register_user(ctx: &ApiContext, input: UserCreate) -> ApiResult<User> {
    if ctx.users.get_by_email(&input.email).await?.is_some() {
        return Err(ApiError::InvalidInput(
            "The user with this email already exists in the system".to_string(),
        ));
    }
    Ok(ctx.users.create(input).await?)
}
