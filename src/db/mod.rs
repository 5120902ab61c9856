//! # Database — PostgreSQL Storage Layer
//!
//! Async storage for the tracker's aggregates via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `users`: heroes — credentials, class, role, xp, level
//! - `bosses`: HP pools with an optimistic `version` column
//! - `tasks`: quests (main and side), workflow status, reward/damage values
//! - `task_assignees`: task ↔ user many-to-many
//! - `comments`: free-text plus resolver-generated audit trail
//! - `notifications`: durable per-user event copies
//! - `rewards`: XP-exchangeable items
//!
//! ## Module Structure
//!
//! Operations are split into submodules by aggregate:
//!
//! - [`users`] — registration, lookup, xp/level writes
//! - [`bosses`] — HP ledger persistence (capacity, damage, restore)
//! - [`tasks`] — quest CRUD, assignee roster, visibility-filtered listing
//! - [`comments`] — activity feed rows
//! - [`notifications`] — durable notification feed
//! - [`rewards`] — reward catalog and exchange

mod bosses;
mod comments;
mod notifications;
mod rewards;
pub mod tasks;
mod users;

use anyhow::Result;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::model::{HeroClass, Role};

// ── User types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub class: String,
    pub role: String,
    pub xp: i64,
    pub level: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        Role::parse(&self.role) == Some(Role::Admin)
    }

    pub fn hero_class(&self) -> Option<HeroClass> {
        HeroClass::parse(&self.class)
    }
}

/// Trimmed roster entry for assignment pickers.
#[derive(Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub class: String,
}

// ── Boss types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BossRow {
    pub id: i64,
    pub name: String,
    pub total_hp: i64,
    pub current_hp: i64,
    pub image_url: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub deadline: Option<chrono::NaiveDate>,
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ── Task types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub label: String,
    pub boss_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub lead_assignee_id: Option<i64>,
    pub xp_reward: i64,
    pub boss_damage: i64,
    pub is_public: bool,
    pub completion_comment: Option<String>,
    pub admin_reply: Option<String>,
    pub admin_reply_by: Option<i64>,
    pub deadline: Option<chrono::NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TaskRow {
    /// Main quests (no parent) are the only tasks that touch boss HP.
    pub fn is_main_quest(&self) -> bool {
        self.parent_task_id.is_none()
    }
}

/// A task joined with its assignee roster (side quests in listings).
#[derive(Serialize)]
pub struct TaskWithAssignees {
    #[serde(flatten)]
    pub task: TaskRow,
    pub assignees: Vec<UserRow>,
}

/// A main quest with its roster and side quests, the shape every task
/// endpoint returns and every `task_updated` broadcast carries.
#[derive(Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskRow,
    pub assignees: Vec<UserRow>,
    pub sub_tasks: Vec<TaskWithAssignees>,
}

// ── Comment / notification / reward types ───────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub content: String,
    pub kind: String,
    pub user_id: i64,
    pub task_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Comment joined with author fields for the activity feed.
#[derive(Serialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub content: String,
    pub kind: String,
    pub user_id: i64,
    pub task_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub class: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub message: String,
    pub kind: String,
    pub user_id: i64,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RewardRow {
    pub id: i64,
    pub name: String,
    pub cost: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL to preserve the full username — sqlx's built-in
    /// parser strips suffix segments that some connection poolers require.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the ordered SQL migration files. Idempotent — every statement
    /// is `CREATE ... IF NOT EXISTS`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/001_core_tables.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Used by the `/readyz` readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(class: &str, role: &str) -> UserRow {
        UserRow {
            id: 1,
            username: "astrid".into(),
            password_hash: "x".into(),
            class: class.into(),
            role: role.into(),
            xp: 0,
            level: 1,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn is_admin_requires_exact_role() {
        assert!(user("Warrior", "ADMIN").is_admin());
        assert!(!user("Warrior", "USER").is_admin());
        assert!(!user("Warrior", "admin").is_admin());
    }

    #[test]
    fn hero_class_parses_known_classes() {
        assert_eq!(user("Cleric", "USER").hero_class(), Some(HeroClass::Cleric));
        assert_eq!(user("Bard", "USER").hero_class(), None);
    }

    #[test]
    fn main_quest_is_parentless() {
        let mut task = TaskRow {
            id: 1,
            title: "t".into(),
            description: None,
            status: "TODO".into(),
            priority: "MEDIUM".into(),
            label: "FEATURE".into(),
            boss_id: None,
            parent_task_id: None,
            lead_assignee_id: None,
            xp_reward: 0,
            boss_damage: 10,
            is_public: false,
            completion_comment: None,
            admin_reply: None,
            admin_reply_by: None,
            deadline: None,
            created_at: chrono::Utc::now(),
        };
        assert!(task.is_main_quest());
        task.parent_task_id = Some(7);
        assert!(!task.is_main_quest());
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let json = serde_json::to_value(user("Mage", "USER")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "astrid");
    }
}
