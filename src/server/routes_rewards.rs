//! Reward catalog and XP exchange.
//!
//! Exchange deducts the cost through a conditional UPDATE, so two
//! concurrent redemptions can never drive a balance negative.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::{RequireAdmin, RequireAuth};
use super::AppState;
use crate::emitter;
use crate::error::ApiError;
use crate::events::Event;

pub async fn handler_rewards_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rewards = state.db.list_rewards().await?;
    Ok(Json(json!({ "rewards": rewards })))
}

#[derive(Deserialize)]
pub struct CreateRewardPayload {
    pub name: String,
    pub cost: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub async fn handler_reward_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CreateRewardPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if payload.cost < 0 {
        return Err(ApiError::Validation("cost cannot be negative".into()));
    }
    let reward = state
        .db
        .create_reward(
            payload.name.trim(),
            payload.cost,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "reward": reward }))))
}

#[derive(Deserialize, Default)]
pub struct UpdateRewardPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub async fn handler_reward_update(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRewardPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.cost.is_some_and(|c| c < 0) {
        return Err(ApiError::Validation("cost cannot be negative".into()));
    }
    let reward = state
        .db
        .update_reward(
            id,
            payload.name.as_deref(),
            payload.cost,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
        )
        .await?
        .ok_or(ApiError::NotFound("reward"))?;
    Ok(Json(json!({ "reward": reward })))
}

pub async fn handler_reward_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.db.delete_reward(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("reward"));
    }
    Ok(Json(json!({ "deleted": true })))
}

#[derive(Deserialize)]
pub struct ExchangePayload {
    pub reward_id: i64,
}

pub async fn handler_reward_exchange(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(payload): Json<ExchangePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reward = state
        .db
        .get_reward(payload.reward_id)
        .await?
        .ok_or(ApiError::NotFound("reward"))?;

    let remaining = state
        .db
        .deduct_xp(user.id, reward.cost)
        .await?
        .ok_or_else(|| ApiError::Validation("not enough xp".into()))?;

    emitter::reward_redeemed(&state.db, &user.username, &reward.name).await?;
    state.event_bus.emit(Event::RewardRedeemed {
        username: user.username.clone(),
        reward_name: reward.name.clone(),
    });
    tracing::info!(
        user_id = user.id,
        reward_id = reward.id,
        cost = reward.cost,
        "reward redeemed"
    );
    Ok(Json(json!({ "reward": reward, "xp": remaining })))
}
