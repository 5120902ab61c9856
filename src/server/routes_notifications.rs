//! Durable notification feed endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::AppState;
use crate::error::ApiError;

pub async fn handler_notifications_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notifications = state.db.list_notifications(user.id).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn handler_notifications_read(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state.db.mark_notifications_read(user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn handler_notifications_clear(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.db.clear_notifications(user.id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
