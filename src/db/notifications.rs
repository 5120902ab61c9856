//! Durable notification feed. The emitter writes rows here before any
//! WebSocket broadcast so offline users still see what happened.

use super::{Database, NotificationRow};
use anyhow::Result;

impl Database {
    pub async fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        kind: &str,
    ) -> Result<NotificationRow> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (message, kind, user_id)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(message)
        .bind(kind)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Fan a single message out to a set of recipients.
    pub async fn insert_notifications(
        &self,
        user_ids: &[i64],
        message: &str,
        kind: &str,
    ) -> Result<()> {
        for user_id in user_ids {
            self.insert_notification(*user_id, message, kind).await?;
        }
        Ok(())
    }

    /// Latest 50 notifications for a user, newest first.
    pub async fn list_notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT 50",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_notifications_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_notifications(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
