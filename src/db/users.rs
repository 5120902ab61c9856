//! User operations: registration, lookup, xp/level writes.
//!
//! xp and level are mutated in exactly two places: the completion resolver
//! (awards) and the reward exchange (deduction). The deduction is a single
//! conditional UPDATE so a concurrent exchange can never drive xp negative.

use super::{Database, UserRow, UserSummary};
use anyhow::Result;

impl Database {
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        class: &str,
        role: &str,
    ) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, class, role)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .bind(class)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Full roster for assignment dropdowns, id/username/class only.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, class FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Ids of every admin, for broadcast-to-admins notifications.
    pub async fn list_admin_ids(&self) -> Result<Vec<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = 'ADMIN' ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    /// Overwrite a user's xp and level with resolver-computed values.
    pub async fn set_user_progress(&self, user_id: i64, xp: i64, level: i64) -> Result<()> {
        sqlx::query("UPDATE users SET xp = $1, level = $2 WHERE id = $3")
            .bind(xp)
            .bind(level)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deduct xp for a reward exchange. Returns the new balance, or `None`
    /// when the user lacks the xp (the UPDATE matches no row).
    pub async fn deduct_xp(&self, user_id: i64, cost: i64) -> Result<Option<i64>> {
        let new_xp: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET xp = xp - $1
             WHERE id = $2 AND xp >= $1
             RETURNING xp",
        )
        .bind(cost)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(new_xp)
    }
}
