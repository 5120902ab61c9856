//! Per-task activity feed: free-text comments plus the resolver's
//! auto-generated audit entries, listed together in order.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::AppState;
use crate::error::ApiError;
use crate::model::CommentKind;

pub async fn handler_comments_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
    Path(task_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .get_task(task_id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let comments = state.db.list_comments(task_id).await?;
    Ok(Json(json!({ "comments": comments })))
}

#[derive(Deserialize)]
pub struct CreateCommentPayload {
    pub content: String,
}

pub async fn handler_comment_create(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(task_id): Path<i64>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }
    state
        .db
        .get_task(task_id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let comment = state
        .db
        .insert_comment(
            task_id,
            user.id,
            payload.content.trim(),
            CommentKind::Comment.as_str(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}
