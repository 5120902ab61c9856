//! Comment rows: free-text discussion plus the resolver's audit trail
//! (proof-of-work, approval, denial entries).

use super::{CommentRow, CommentWithAuthor, Database};
use anyhow::Result;

impl Database {
    pub async fn insert_comment(
        &self,
        task_id: i64,
        user_id: i64,
        content: &str,
        kind: &str,
    ) -> Result<CommentRow> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (content, kind, user_id, task_id)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(content)
        .bind(kind)
        .bind(user_id)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Activity feed for a task, oldest first, with author fields joined in.
    pub async fn list_comments(&self, task_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query_as::<_, CommentWithAuthor>(
            "SELECT c.id, c.content, c.kind, c.user_id, c.task_id, c.created_at,
                    u.username, u.class
             FROM comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.task_id = $1
             ORDER BY c.created_at ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
