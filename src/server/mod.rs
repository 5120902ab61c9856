//! # Server — HTTP API and Realtime Hub
//!
//! Runs the Axum server that exposes the quest/boss REST API and the
//! WebSocket feed that keeps every connected party dashboard live.

pub(crate) mod middleware_auth;
mod routes_auth;
mod routes_bosses;
mod routes_comments;
mod routes_health;
mod routes_notifications;
mod routes_rewards;
mod routes_tasks;
mod websocket;

use crate::{db, events, resolver};
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

pub struct AppState {
    pub db: db::Database,
    pub event_bus: events::EventBus,
    pub jwt_secret: String,
    pub settings: resolver::Settings,
}

impl AppState {
    pub fn with_db(
        db: db::Database,
        jwt_secret: String,
        settings: resolver::Settings,
    ) -> Arc<Self> {
        Arc::new(AppState {
            db,
            event_bus: events::EventBus::new(),
            jwt_secret,
            settings,
        })
    }
}

/// Generates (or propagates) a request ID for correlation and wraps the
/// request in a tracing span using `.instrument()` for proper async
/// propagation.
async fn request_id_middleware(req: Request, next: Next) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket::handler_ws))
        .route("/api/auth/register", post(routes_auth::handler_register))
        .route("/api/auth/login", post(routes_auth::handler_login))
        .route("/api/auth/me", get(routes_auth::handler_me))
        .route("/api/users", get(routes_auth::handler_users_list))
        .route(
            "/api/tasks",
            get(routes_tasks::handler_tasks_list).post(routes_tasks::handler_task_create),
        )
        .route(
            "/api/tasks/{id}",
            get(routes_tasks::handler_task_get)
                .patch(routes_tasks::handler_task_transition)
                .delete(routes_tasks::handler_task_delete),
        )
        .route(
            "/api/tasks/{id}/comments",
            get(routes_comments::handler_comments_list)
                .post(routes_comments::handler_comment_create),
        )
        .route(
            "/api/bosses",
            get(routes_bosses::handler_bosses_list).post(routes_bosses::handler_boss_create),
        )
        .route("/api/bosses/active", get(routes_bosses::handler_boss_active))
        .route(
            "/api/bosses/{id}",
            get(routes_bosses::handler_boss_get)
                .patch(routes_bosses::handler_boss_update)
                .delete(routes_bosses::handler_boss_delete),
        )
        .route(
            "/api/notifications",
            get(routes_notifications::handler_notifications_list)
                .delete(routes_notifications::handler_notifications_clear),
        )
        .route(
            "/api/notifications/read",
            put(routes_notifications::handler_notifications_read),
        )
        .route(
            "/api/rewards",
            get(routes_rewards::handler_rewards_list).post(routes_rewards::handler_reward_create),
        )
        .route(
            "/api/rewards/exchange",
            post(routes_rewards::handler_reward_exchange),
        )
        .route(
            "/api/rewards/{id}",
            axum::routing::patch(routes_rewards::handler_reward_update)
                .delete(routes_rewards::handler_reward_delete),
        )
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(
    port: u16,
    database_url: &str,
    jwt_secret: String,
    settings: resolver::Settings,
) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    database.migrate().await?;
    let state = AppState::with_db(database, jwt_secret, settings);
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "server running");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! { _ = ctrl_c => info!("received SIGINT, shutting down"), _ = sigterm.recv() => info!("received SIGTERM, shutting down") }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
