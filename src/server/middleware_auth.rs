//! JWT auth for API routes.
//!
//! Tokens are issued by the login/register handlers (HS256, 7-day expiry)
//! and carry the user id as `sub`. Extractors load the full user row so
//! handlers see fresh role/class/xp values, not stale claims.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::db::UserRow;

const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: i64,
    username: String,
    exp: i64,
}

/// Mint a token for a freshly registered or logged-in user.
pub fn issue_token(secret: &str, user: &UserRow) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn decode_token(secret: &str, token: &str) -> Result<Claims, String> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| format!("JWT verification failed: {}", e))?;
    Ok(data.claims)
}

async fn load_authenticated_user(state: &Arc<AppState>, parts: &Parts) -> Option<UserRow> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;
    let claims = decode_token(&state.jwt_secret, token).ok()?;
    state.db.get_user(claims.sub).await.ok().flatten()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Authentication required"})),
    )
        .into_response()
}

/// Extractor that requires any authenticated user.
///
/// Returns 401 if no valid token is present or the user no longer exists.
pub struct RequireAuth(pub UserRow);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = load_authenticated_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;
        Ok(RequireAuth(user))
    }
}

/// Extractor that requires an authenticated admin.
///
/// Returns 401 without a valid token, 403 for non-admins.
pub struct RequireAdmin(pub UserRow);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = load_authenticated_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;
        if !user.is_admin() {
            return Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Admin access required"})),
            )
                .into_response());
        }
        Ok(RequireAdmin(user))
    }
}
