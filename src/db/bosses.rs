//! Boss HP ledger persistence.
//!
//! Capacity changes (task created/deleted) are single atomic UPDATEs with the
//! clamping done in SQL, so they cannot lose updates. Damage and restore
//! writes instead carry the row's `version` as an optimistic concurrency
//! token: the resolver reads the boss, computes the new HP through
//! [`crate::ledger`], and writes back `WHERE version = $expected`. A stale
//! write matches zero rows and surfaces to the caller as a conflict.

use super::{BossRow, Database};
use anyhow::Result;

impl Database {
    pub async fn create_boss(
        &self,
        name: &str,
        total_hp: i64,
        image_url: Option<&str>,
        start_date: Option<chrono::NaiveDate>,
        deadline: Option<chrono::NaiveDate>,
    ) -> Result<BossRow> {
        let row = sqlx::query_as::<_, BossRow>(
            "INSERT INTO bosses (name, total_hp, current_hp, image_url, start_date, deadline)
             VALUES ($1, $2, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(name)
        .bind(total_hp)
        .bind(image_url)
        .bind(start_date)
        .bind(deadline)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_boss(&self, id: i64) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>("SELECT * FROM bosses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_bosses(&self) -> Result<Vec<BossRow>> {
        let rows = sqlx::query_as::<_, BossRow>(
            "SELECT * FROM bosses ORDER BY start_date ASC NULLS LAST, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The boss whose [start_date, deadline] window contains `today`,
    /// falling back to the most recently created boss so the frontend never
    /// shows an empty screen.
    pub async fn get_active_boss(&self, today: chrono::NaiveDate) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>(
            "SELECT * FROM bosses
             WHERE start_date <= $1 AND deadline >= $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        if row.is_some() {
            return Ok(row);
        }
        let fallback = sqlx::query_as::<_, BossRow>(
            "SELECT * FROM bosses ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(fallback)
    }

    /// Admin metadata edit. HP columns are owned by the ledger operations
    /// and are not writable here.
    pub async fn update_boss(
        &self,
        id: i64,
        name: Option<&str>,
        image_url: Option<&str>,
        start_date: Option<chrono::NaiveDate>,
        deadline: Option<chrono::NaiveDate>,
    ) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>(
            "UPDATE bosses SET
                name = COALESCE($2, name),
                image_url = COALESCE($3, image_url),
                start_date = COALESCE($4, start_date),
                deadline = COALESCE($5, deadline)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(image_url)
        .bind(start_date)
        .bind(deadline)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete a boss, cascading its tasks (which cascade side quests,
    /// comments, and assignee links through their FKs).
    pub async fn delete_boss(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tasks WHERE boss_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM bosses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Main-quest creation: the boss grows mid-fight, new capacity at full
    /// health. Atomic, no version check needed.
    pub async fn add_boss_capacity(&self, id: i64, amount: i64) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>(
            "UPDATE bosses SET
                total_hp = total_hp + $2,
                current_hp = current_hp + $2,
                version = version + 1
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Main-quest deletion: both columns decremented, floored at zero.
    pub async fn remove_boss_capacity(&self, id: i64, amount: i64) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>(
            "UPDATE bosses SET
                total_hp = GREATEST(0, total_hp - $2),
                current_hp = GREATEST(0, current_hp - $2),
                version = version + 1
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Write a resolver-computed `current_hp`, guarded by the version read
    /// alongside it. Returns `None` when the version was stale — the caller
    /// reports a conflict rather than silently losing a concurrent update.
    pub async fn set_boss_hp_checked(
        &self,
        id: i64,
        current_hp: i64,
        expected_version: i64,
    ) -> Result<Option<BossRow>> {
        let row = sqlx::query_as::<_, BossRow>(
            "UPDATE bosses SET current_hp = $2, version = version + 1
             WHERE id = $1 AND version = $3
             RETURNING *",
        )
        .bind(id)
        .bind(current_hp)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
