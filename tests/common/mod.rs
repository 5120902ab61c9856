//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs migrations once per test suite).
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        // Own runtime on a scratch thread, since callers are already inside
        // a tokio test runtime.
        std::thread::spawn(|| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let db = questline::db::Database::connect(&test_db_url())
                    .await
                    .expect("Failed to connect to test database");
                db.migrate().await.expect("Failed to run migrations");
            });
        })
        .join()
        .expect("schema init failed");
    });
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> questline::db::Database {
    ensure_schema();
    let db = questline::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Build an Axum test app router connected to the test database.
pub async fn build_test_app() -> axum::Router {
    build_test_app_with_settings(questline::resolver::Settings::default()).await
}

/// Same, but also hands back the shared state so tests can subscribe to the
/// event bus and observe broadcasts.
pub async fn build_test_app_with_state(
) -> (axum::Router, std::sync::Arc<questline::server::AppState>) {
    let db = setup_test_db().await;
    let state = questline::server::AppState::with_db(
        db,
        "test-jwt-secret".to_string(),
        questline::resolver::Settings::default(),
    );
    (
        questline::server::build_router(state.clone()),
        state,
    )
}

/// Same, but with custom game-rule settings (e.g. a raised level-up cap).
pub async fn build_test_app_with_settings(
    settings: questline::resolver::Settings,
) -> axum::Router {
    let db = setup_test_db().await;
    let state = questline::server::AppState::with_db(
        db,
        "test-jwt-secret".to_string(),
        settings,
    );
    questline::server::build_router(state)
}

/// Connect a second handle to the test database WITHOUT truncating, for
/// tests that need to inspect or tweak rows behind the API's back.
pub async fn connect_db() -> questline::db::Database {
    ensure_schema();
    questline::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database")
}

/// Truncate all tables to ensure test isolation.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE notifications, comments, task_assignees, tasks,
                       rewards, bosses, users
         CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();
}
