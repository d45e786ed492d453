use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use technews_db::models::{NewPost, NewVote};
use technews_types::api::{CreatePostRequest, UpdatePostRequest, UpvoteRequest};
use technews_types::models::{Post, PostDetail, PostSummary};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_blocking};

/// GET /api/posts: newest first, each with author username and vote_count.
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = run_blocking(&state, |db| db.list_posts()).await?;
    let posts: Vec<PostSummary> = rows.into_iter().map(PostSummary::from).collect();
    Ok(Json(posts))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let post = run_blocking(&state, move |db| db.get_post(id))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))?;
    Ok(Json(PostDetail::from(post)))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewPost {
        title: req.title,
        post_url: req.post_url,
        user_id: req.user_id,
    };
    let row = run_blocking(&state, move |db| db.create_post(new)).await?;
    info!("User {} created post {}", row.user_id, row.id);
    Ok(Json(Post::from(row)))
}

/// PUT /api/posts/upvote: records the vote, then returns the refreshed post.
pub async fn upvote(
    State(state): State<AppState>,
    Json(req): Json<UpvoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let vote = NewVote {
        user_id: req.user_id,
        post_id: req.post_id,
    };
    let post = run_blocking(&state, move |db| db.upvote(vote))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))?;
    Ok(Json(PostDetail::from(post)))
}

/// PUT /api/posts/{id}: only the title is updatable.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated =
        run_blocking(&state, move |db| db.update_post_title(id, req.title.as_deref())).await?;
    if updated == 0 {
        return Err(ApiError::not_found("post"));
    }
    Ok(Json([updated]))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = run_blocking(&state, move |db| db.delete_post(id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("post"));
    }
    Ok(Json(deleted))
}
