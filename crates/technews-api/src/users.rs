use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use technews_db::models::{NewUser, UserChanges};
use technews_types::api::{CreateUserRequest, UpdateUserRequest};
use technews_types::models::{User, UserProfile};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_blocking};

/// GET /api/users: password hashes are never serialized.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = run_blocking(&state, |db| db.list_users()).await?;
    let users: Vec<User> = rows.into_iter().map(User::from).collect();
    Ok(Json(users))
}

/// GET /api/users/{id}: with owned posts, comments and voted_posts.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let profile = run_blocking(&state, move |db| db.get_user_profile(id))
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(UserProfile::from(profile)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewUser {
        username: req.username,
        email: req.email,
        password: req.password,
    };
    let row = run_blocking(&state, move |db| db.create_user(new)).await?;
    info!("Registered user {} ({})", row.id, row.username);
    Ok(Json(User::from(row)))
}

/// PUT /api/users/{id}: responds with `[affected_rows]`.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let changes = UserChanges {
        username: req.username,
        email: req.email,
        password: req.password,
    };
    let updated = run_blocking(&state, move |db| db.update_user(id, changes)).await?;
    if updated == 0 {
        return Err(ApiError::not_found("user"));
    }
    Ok(Json([updated]))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = run_blocking(&state, move |db| db.delete_user(id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("user"));
    }
    info!("Deleted user {}", id);
    Ok(Json(deleted))
}
