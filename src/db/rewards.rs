//! Reward catalog. Exchange itself lives in the route layer: it pairs
//! `deduct_xp` with a catalog lookup.

use super::{Database, RewardRow};
use anyhow::Result;

impl Database {
    pub async fn create_reward(
        &self,
        name: &str,
        cost: i64,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<RewardRow> {
        let row = sqlx::query_as::<_, RewardRow>(
            "INSERT INTO rewards (name, cost, description, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(name)
        .bind(cost)
        .bind(description)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_reward(&self, id: i64) -> Result<Option<RewardRow>> {
        let row = sqlx::query_as::<_, RewardRow>("SELECT * FROM rewards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_rewards(&self) -> Result<Vec<RewardRow>> {
        let rows =
            sqlx::query_as::<_, RewardRow>("SELECT * FROM rewards ORDER BY cost ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn update_reward(
        &self,
        id: i64,
        name: Option<&str>,
        cost: Option<i64>,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Option<RewardRow>> {
        let row = sqlx::query_as::<_, RewardRow>(
            "UPDATE rewards SET
                name = COALESCE($2, name),
                cost = COALESCE($3, cost),
                description = COALESCE($4, description),
                image_url = COALESCE($5, image_url)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(cost)
        .bind(description)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_reward(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rewards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
