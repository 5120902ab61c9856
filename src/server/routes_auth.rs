//! Registration, login, and user listing.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::middleware_auth::{issue_token, RequireAuth};
use super::AppState;
use crate::error::ApiError;
use crate::model::{HeroClass, Role};

const BCRYPT_COST: u32 = 10;

/// Postgres unique_violation on `users.username` becomes a 409.
fn map_username_taken(err: anyhow::Error) -> ApiError {
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::Conflict("username already taken".into());
        }
    }
    ApiError::Internal(err)
}

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
    pub class: String,
    #[serde(default)]
    pub role: Option<String>,
}

pub async fn handler_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".into(),
        ));
    }
    let class = HeroClass::parse(&payload.class)
        .ok_or_else(|| ApiError::Validation(format!("unknown class {:?}", payload.class)))?;
    let role = match payload.role.as_deref() {
        None => Role::User,
        Some(r) => {
            Role::parse(r).ok_or_else(|| ApiError::Validation(format!("unknown role {:?}", r)))?
        }
    };

    let password = payload.password.clone();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    // Duplicate usernames surface as a unique violation, mapped to 409.
    let user = state
        .db
        .create_user(&username, &hash, class.as_str(), role.as_str())
        .await
        .map_err(map_username_taken)?;
    tracing::info!(user_id = user.id, username = %user.username, "hero registered");

    let token = issue_token(&state.jwt_secret, &user)?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "token": token, "user": user })),
    ))
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

pub async fn handler_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(payload.username.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;

    let hash = user.password_hash.clone();
    let password = payload.password.clone();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(anyhow::Error::from)?
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let token = issue_token(&state.jwt_secret, &user)?;
    Ok(Json(json!({ "token": token, "user": user })))
}

pub async fn handler_me(RequireAuth(user): RequireAuth) -> Json<serde_json::Value> {
    Json(json!({ "user": user }))
}

pub async fn handler_users_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let users = state.db.list_users().await?;
    Ok(Json(json!({ "users": users })))
}
