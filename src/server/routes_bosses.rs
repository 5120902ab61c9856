//! Boss endpoints: listing, the active-boss lookup, creation from an
//! initial quest batch, metadata updates, and cascading deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::{RequireAdmin, RequireAuth};
use super::AppState;
use crate::db::tasks::NewTask;
use crate::error::ApiError;
use crate::events::Event;
use crate::ledger;
use crate::model::{Label, Priority};

pub async fn handler_bosses_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bosses = state.db.list_bosses().await?;
    Ok(Json(json!({ "bosses": bosses })))
}

pub async fn handler_boss_get(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let boss = state
        .db
        .get_boss(id)
        .await?
        .ok_or(ApiError::NotFound("boss"))?;
    Ok(Json(json!({ "boss": boss })))
}

pub async fn handler_boss_active(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let boss = state.db.get_active_boss(today).await?;
    Ok(Json(json!({ "boss": boss })))
}

#[derive(Deserialize)]
pub struct SeedTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    pub boss_damage: i64,
}

#[derive(Deserialize)]
pub struct CreateBossPayload {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub deadline: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<SeedTask>,
}

pub async fn handler_boss_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CreateBossPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    for seed in &payload.tasks {
        if let Some(p) = seed.priority.as_deref() {
            Priority::parse(p)
                .ok_or_else(|| ApiError::Validation(format!("unknown priority {:?}", p)))?;
        }
        if let Some(l) = seed.label.as_deref() {
            Label::parse(l)
                .ok_or_else(|| ApiError::Validation(format!("unknown label {:?}", l)))?;
        }
    }

    let damages: Vec<i64> = payload.tasks.iter().map(|t| t.boss_damage).collect();
    let total_hp =
        ledger::validate_seed(&damages).map_err(|e| ApiError::Validation(e.to_string()))?;

    let boss = state
        .db
        .create_boss(
            payload.name.trim(),
            total_hp,
            payload.image_url.as_deref(),
            payload.start_date,
            payload.deadline,
        )
        .await?;

    for seed in &payload.tasks {
        state
            .db
            .create_task(&NewTask {
                title: seed.title.trim(),
                description: seed.description.as_deref(),
                priority: seed.priority.as_deref().unwrap_or("MEDIUM"),
                label: seed.label.as_deref().unwrap_or("FEATURE"),
                boss_id: Some(boss.id),
                parent_task_id: None,
                lead_assignee_id: None,
                xp_reward: seed.xp_reward.unwrap_or(10),
                boss_damage: seed.boss_damage,
                is_public: true,
                deadline: None,
            })
            .await?;
    }

    state.event_bus.emit(Event::BossCreated {
        boss: serde_json::to_value(&boss).unwrap_or(json!({})),
    });
    tracing::info!(boss_id = boss.id, name = %boss.name, total_hp, "boss created");
    Ok((StatusCode::CREATED, Json(json!({ "boss": boss }))))
}

#[derive(Deserialize, Default)]
pub struct UpdateBossPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub deadline: Option<chrono::NaiveDate>,
}

pub async fn handler_boss_update(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBossPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let boss = state
        .db
        .update_boss(
            id,
            payload.name.as_deref(),
            payload.image_url.as_deref(),
            payload.start_date,
            payload.deadline,
        )
        .await?
        .ok_or(ApiError::NotFound("boss"))?;
    state.event_bus.emit(Event::BossUpdated {
        boss: serde_json::to_value(&boss).unwrap_or(json!({})),
    });
    Ok(Json(json!({ "boss": boss })))
}

pub async fn handler_boss_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.db.delete_boss(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("boss"));
    }
    state.event_bus.emit(Event::BossDeleted { boss_id: id });
    tracing::info!(boss_id = id, "boss deleted");
    Ok(Json(json!({ "deleted": true })))
}
