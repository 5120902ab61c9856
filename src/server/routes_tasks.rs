//! Quest endpoints: listing, creation, the transition state machine, and
//! deletion.
//!
//! PATCH is the heart of the system. One request may carry a status change,
//! roster changes, and field edits; the authorizer vets the combination,
//! then the resolver runs whichever completion branch the status change
//! fired.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::{RequireAdmin, RequireAuth};
use super::AppState;
use crate::authorizer::{self, TransitionRequest};
use crate::db::tasks::{NewTask, TaskFieldPatch};
use crate::db::{TaskDetail, TaskRow, UserRow};
use crate::emitter;
use crate::error::ApiError;
use crate::events::Event;
use crate::ledger;
use crate::model::{Label, Priority, TaskStatus};
use crate::resolver::{self, Ctx};

fn detail_json(detail: &TaskDetail) -> serde_json::Value {
    serde_json::to_value(detail).unwrap_or(json!({}))
}

pub async fn handler_tasks_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tasks = if user.is_admin() {
        state.db.list_main_quests_admin().await?
    } else {
        state.db.list_main_quests_for_user(user.id).await?
    };
    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn handler_task_get(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let detail = state
        .db
        .get_task_detail(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    if !user.is_admin() && !detail.task.is_public {
        let on_roster = detail.assignees.iter().any(|a| a.id == user.id)
            || detail.task.lead_assignee_id == Some(user.id);
        if !on_roster {
            return Err(ApiError::Permission("not your quest".into()));
        }
    }
    Ok(Json(json!({ "task": detail })))
}

#[derive(Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub boss_id: Option<i64>,
    #[serde(default)]
    pub parent_task_id: Option<i64>,
    #[serde(default)]
    pub lead_assignee_id: Option<i64>,
    #[serde(default)]
    pub assignee_ids: Vec<i64>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    #[serde(default)]
    pub boss_damage: Option<i64>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub deadline: Option<chrono::NaiveDate>,
}

pub async fn handler_task_create(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    let priority = payload.priority.as_deref().unwrap_or("MEDIUM");
    Priority::parse(priority)
        .ok_or_else(|| ApiError::Validation(format!("unknown priority {:?}", priority)))?;
    let label = payload.label.as_deref().unwrap_or("FEATURE");
    Label::parse(label)
        .ok_or_else(|| ApiError::Validation(format!("unknown label {:?}", label)))?;

    let boss_damage = payload.boss_damage.unwrap_or(10);
    let xp_reward = payload.xp_reward.unwrap_or(10);
    if boss_damage < 0 || xp_reward < 0 {
        return Err(ApiError::Validation(
            "xp_reward and boss_damage cannot be negative".into(),
        ));
    }

    // Main quests are admin territory; side quests may also come from the
    // parent's lead assignee, and inherit the parent's boss.
    let boss_id = match payload.parent_task_id {
        None => {
            if !user.is_admin() {
                return Err(ApiError::Permission("only admins create main quests".into()));
            }
            payload.boss_id
        }
        Some(parent_id) => {
            let parent = state
                .db
                .get_task(parent_id)
                .await?
                .ok_or(ApiError::NotFound("task"))?;
            if !user.is_admin() && parent.lead_assignee_id != Some(user.id) {
                return Err(ApiError::Permission(
                    "only the lead assignee adds side quests".into(),
                ));
            }
            parent.boss_id
        }
    };

    if let Some(boss_id) = boss_id {
        state
            .db
            .get_boss(boss_id)
            .await?
            .ok_or(ApiError::NotFound("boss"))?;
    }

    // Lead is always part of the roster.
    let mut assignee_ids = payload.assignee_ids.clone();
    if let Some(lead) = payload.lead_assignee_id {
        if !assignee_ids.contains(&lead) {
            assignee_ids.push(lead);
        }
    }

    let task = state
        .db
        .create_task(&NewTask {
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            priority,
            label,
            boss_id,
            parent_task_id: payload.parent_task_id,
            lead_assignee_id: payload.lead_assignee_id,
            xp_reward,
            boss_damage,
            is_public: payload.is_public.unwrap_or(false),
            deadline: payload.deadline,
        })
        .await?;

    if !assignee_ids.is_empty() {
        state.db.set_task_assignees(task.id, &assignee_ids).await?;
        emitter::assignment(&state.db, &task, &assignee_ids, &[]).await?;
    }

    // New capacity arrives at full health; only main quests grow the boss.
    if task.is_main_quest() && task.boss_damage > 0 {
        if let Some(boss_id) = task.boss_id {
            if let Some(boss) = state.db.add_boss_capacity(boss_id, task.boss_damage).await? {
                state.event_bus.emit(Event::BossUpdated {
                    boss: serde_json::to_value(&boss).unwrap_or(json!({})),
                });
            }
        }
    }

    let detail = state
        .db
        .get_task_detail(task.id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    state.event_bus.emit(Event::TaskCreated {
        task: detail_json(&detail),
    });
    tracing::info!(task_id = task.id, title = %task.title, "quest created");
    Ok((StatusCode::CREATED, Json(json!({ "task": detail }))))
}

#[derive(Deserialize, Default)]
pub struct TransitionPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub lead_assignee_id: Option<i64>,
    #[serde(default)]
    pub completion_comment: Option<String>,
    #[serde(default)]
    pub admin_reply: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub deadline: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    #[serde(default)]
    pub boss_damage: Option<i64>,
}

impl TransitionPayload {
    fn writes_admin_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.priority.is_some()
            || self.label.is_some()
            || self.is_public.is_some()
            || self.deadline.is_some()
            || self.xp_reward.is_some()
            || self.boss_damage.is_some()
            || self.admin_reply.is_some()
            || self.lead_assignee_id.is_some()
    }
}

pub async fn handler_task_transition(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = state
        .db
        .get_task(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let old_assignees = state.db.get_task_assignees(id).await?;
    let old_assignee_ids: Vec<i64> = old_assignees.iter().map(|a| a.id).collect();

    let old_status = TaskStatus::parse(&task.status)
        .ok_or_else(|| ApiError::Validation(format!("task has unknown status {:?}", task.status)))?;
    let new_status = match payload.status.as_deref() {
        None => None,
        Some(s) => Some(
            TaskStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("unknown status {:?}", s)))?,
        ),
    };
    if let Some(p) = payload.priority.as_deref() {
        Priority::parse(p)
            .ok_or_else(|| ApiError::Validation(format!("unknown priority {:?}", p)))?;
    }
    if let Some(l) = payload.label.as_deref() {
        Label::parse(l).ok_or_else(|| ApiError::Validation(format!("unknown label {:?}", l)))?;
    }

    let request = TransitionRequest {
        new_status,
        changes_assignees: payload.assignee_ids.is_some(),
        writes_admin_fields: payload.writes_admin_fields(),
    };
    authorizer::authorize(&user, &old_assignee_ids, task.lead_assignee_id, &request)
        .map_err(|deny| ApiError::Permission(deny.to_string()))?;

    // Roster first so completion branches see the final party.
    if let Some(new_ids) = &payload.assignee_ids {
        state.db.set_task_assignees(id, new_ids).await?;
        let added: Vec<i64> = new_ids
            .iter()
            .copied()
            .filter(|uid| !old_assignee_ids.contains(uid))
            .collect();
        emitter::assignment(&state.db, &task, &added, &old_assignee_ids).await?;
        // Veterans' dashboards hear about the reinforcements.
        if !added.is_empty() && !old_assignee_ids.is_empty() {
            state.event_bus.emit(Event::FriendJoined {
                task_id: task.id,
                task_title: task.title.clone(),
                newcomer_count: added.len() as i64,
            });
        }
    }

    let patch = TaskFieldPatch {
        title: payload.title.as_deref(),
        description: payload.description.as_deref(),
        priority: payload.priority.as_deref(),
        label: payload.label.as_deref(),
        is_public: payload.is_public,
        deadline: payload.deadline,
        xp_reward: payload.xp_reward,
        boss_damage: payload.boss_damage,
        completion_comment: payload.completion_comment.as_deref(),
        admin_reply: payload.admin_reply.as_deref(),
        admin_reply_by: payload.admin_reply.as_ref().map(|_| user.id),
        lead_assignee_id: payload.lead_assignee_id,
    };
    let task = state
        .db
        .update_task_fields(id, &patch)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let assignees = state.db.get_task_assignees(id).await?;

    if let Some(new_status) = new_status {
        run_status_branch(&state, &user, &task, &assignees, old_status, new_status, &payload)
            .await?;
        state.db.set_task_status(id, new_status.as_str()).await?;
    }

    let detail = state
        .db
        .get_task_detail(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    state.event_bus.emit(Event::TaskUpdated {
        task: detail_json(&detail),
    });
    // Side quest changes also refresh the parent's card.
    if let Some(parent_id) = detail.task.parent_task_id {
        if let Some(parent) = state.db.get_task_detail(parent_id).await? {
            state.event_bus.emit(Event::TaskUpdated {
                task: detail_json(&parent),
            });
        }
    }
    Ok(Json(json!({ "task": detail })))
}

/// Dispatch the resolver branch a status change fires. Forward runs only
/// when leaving a non-DONE status for DONE, reverse only when leaving DONE,
/// so re-saving a DONE task never double-applies.
async fn run_status_branch(
    state: &Arc<AppState>,
    user: &UserRow,
    task: &TaskRow,
    assignees: &[UserRow],
    old_status: TaskStatus,
    new_status: TaskStatus,
    payload: &TransitionPayload,
) -> Result<(), ApiError> {
    let ctx = Ctx {
        db: &state.db,
        events: &state.event_bus,
        actor: user,
        settings: state.settings,
    };
    match (old_status, new_status) {
        (old, TaskStatus::Done) if old != TaskStatus::Done => {
            resolver::resolve_forward(&ctx, task, assignees).await
        }
        (TaskStatus::Done, TaskStatus::InProgress) => {
            resolver::resolve_reopen(&ctx, task, assignees).await
        }
        (TaskStatus::PendingReview, TaskStatus::InProgress) if user.is_admin() => {
            let reply = payload
                .admin_reply
                .clone()
                .or_else(|| task.admin_reply.clone())
                .unwrap_or_default();
            resolver::resolve_denial(&ctx, task, &reply).await
        }
        (old, TaskStatus::PendingReview) if old != TaskStatus::PendingReview => {
            resolver::resolve_submission(&ctx, task).await
        }
        _ => Ok(()),
    }
}

pub async fn handler_task_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = state
        .db
        .get_task(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    // Deleting a main quest shrinks the boss pool it contributed to.
    if task.is_main_quest() && task.boss_damage > 0 {
        if let Some(boss_id) = task.boss_id {
            if let Some(boss) = state
                .db
                .remove_boss_capacity(boss_id, task.boss_damage)
                .await?
            {
                state.event_bus.emit(Event::BossUpdated {
                    boss: serde_json::to_value(&boss).unwrap_or(json!({})),
                });
                if ledger::is_defeated(boss.current_hp) && boss.total_hp == 0 {
                    tracing::info!(boss_id = boss.id, "boss pool emptied");
                }
            }
        }
    }

    state.db.delete_task(id).await?;
    state.event_bus.emit(Event::TaskDeleted { task_id: id });
    tracing::info!(task_id = id, "quest deleted");
    Ok(Json(json!({ "deleted": true })))
}
