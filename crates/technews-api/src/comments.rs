use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use technews_db::models::NewComment;
use technews_types::api::CreateCommentRequest;
use technews_types::models::Comment;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_blocking};

pub async fn list_comments(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = run_blocking(&state, |db| db.list_comments()).await?;
    let comments: Vec<Comment> = rows.into_iter().map(Comment::from).collect();
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewComment {
        comment_text: req.comment_text,
        user_id: req.user_id,
        post_id: req.post_id,
    };
    let row = run_blocking(&state, move |db| db.create_comment(new)).await?;
    Ok(Json(Comment::from(row)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = run_blocking(&state, move |db| db.delete_comment(id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("comment"));
    }
    Ok(Json(deleted))
}
