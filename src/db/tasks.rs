//! Quest CRUD, assignee roster, and visibility-filtered listing.
//!
//! Tasks come in two shapes: main quests (no parent, the only tasks that
//! touch boss HP) and side quests (parented, XP only). The lead assignee is
//! an explicit column set at creation, never inferred from roster order.

use super::{Database, TaskDetail, TaskRow, TaskWithAssignees, UserRow};
use anyhow::Result;

/// Creation parameters for a task row. The caller has already validated
/// enum strings and resolved the owning boss for side quests.
pub struct NewTask<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: &'a str,
    pub label: &'a str,
    pub boss_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub lead_assignee_id: Option<i64>,
    pub xp_reward: i64,
    pub boss_damage: i64,
    pub is_public: bool,
    pub deadline: Option<chrono::NaiveDate>,
}

/// Admin-editable field patch for the transition endpoint. `None` leaves the
/// column untouched.
#[derive(Default)]
pub struct TaskFieldPatch<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub label: Option<&'a str>,
    pub is_public: Option<bool>,
    pub deadline: Option<chrono::NaiveDate>,
    pub xp_reward: Option<i64>,
    pub boss_damage: Option<i64>,
    pub completion_comment: Option<&'a str>,
    pub admin_reply: Option<&'a str>,
    pub admin_reply_by: Option<i64>,
    pub lead_assignee_id: Option<i64>,
}

impl Database {
    pub async fn create_task(&self, new: &NewTask<'_>) -> Result<TaskRow> {
        let row = sqlx::query_as::<_, TaskRow>(
            "INSERT INTO tasks (title, description, priority, label, boss_id,
                                parent_task_id, lead_assignee_id, xp_reward,
                                boss_damage, is_public, deadline)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(new.title)
        .bind(new.description)
        .bind(new.priority)
        .bind(new.label)
        .bind(new.boss_id)
        .bind(new.parent_task_id)
        .bind(new.lead_assignee_id)
        .bind(new.xp_reward)
        .bind(new.boss_damage)
        .bind(new.is_public)
        .bind(new.deadline)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_task_assignees(&self, task_id: i64) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT u.* FROM users u
             JOIN task_assignees ta ON ta.user_id = u.id
             WHERE ta.task_id = $1
             ORDER BY u.id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Replace the assignee roster in one transaction.
    pub async fn set_task_assignees(&self, task_id: i64, user_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id)
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Main quests visible to an admin: all of them.
    pub async fn list_main_quests_admin(&self) -> Result<Vec<TaskDetail>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE parent_task_id IS NULL ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_details(rows).await
    }

    /// Main quests visible to a regular user: public ones plus any they are
    /// assigned to.
    pub async fn list_main_quests_for_user(&self, user_id: i64) -> Result<Vec<TaskDetail>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT DISTINCT t.* FROM tasks t
             LEFT JOIN task_assignees ta ON ta.task_id = t.id
             WHERE t.parent_task_id IS NULL
               AND (t.is_public OR ta.user_id = $1)
             ORDER BY t.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_details(rows).await
    }

    pub async fn get_task_detail(&self, id: i64) -> Result<Option<TaskDetail>> {
        match self.get_task(id).await? {
            Some(task) => Ok(Some(self.hydrate_detail(task).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_side_quests(&self, parent_id: i64) -> Result<Vec<TaskWithAssignees>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE parent_task_id = $1 ORDER BY created_at ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for task in rows {
            let assignees = self.get_task_assignees(task.id).await?;
            out.push(TaskWithAssignees { task, assignees });
        }
        Ok(out)
    }

    pub async fn update_task_fields(
        &self,
        id: i64,
        patch: &TaskFieldPatch<'_>,
    ) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                label = COALESCE($5, label),
                is_public = COALESCE($6, is_public),
                deadline = COALESCE($7, deadline),
                xp_reward = COALESCE($8, xp_reward),
                boss_damage = COALESCE($9, boss_damage),
                completion_comment = COALESCE($10, completion_comment),
                admin_reply = COALESCE($11, admin_reply),
                admin_reply_by = COALESCE($12, admin_reply_by),
                lead_assignee_id = COALESCE($13, lead_assignee_id)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.priority)
        .bind(patch.label)
        .bind(patch.is_public)
        .bind(patch.deadline)
        .bind(patch.xp_reward)
        .bind(patch.boss_damage)
        .bind(patch.completion_comment)
        .bind(patch.admin_reply)
        .bind(patch.admin_reply_by)
        .bind(patch.lead_assignee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_task_status(&self, id: i64, status: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a task; side quests, comments, and roster links cascade
    /// through their foreign keys.
    pub async fn delete_task(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sum of boss_damage over the boss's surviving main quests. The boss's
    /// `total_hp` must always equal this sum.
    pub async fn sum_main_quest_damage(&self, boss_id: i64) -> Result<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(boss_damage), 0)::BIGINT FROM tasks
             WHERE boss_id = $1 AND parent_task_id IS NULL",
        )
        .bind(boss_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn hydrate_detail(&self, task: TaskRow) -> Result<TaskDetail> {
        let assignees = self.get_task_assignees(task.id).await?;
        let sub_tasks = self.get_side_quests(task.id).await?;
        Ok(TaskDetail {
            task,
            assignees,
            sub_tasks,
        })
    }

    async fn hydrate_details(&self, rows: Vec<TaskRow>) -> Result<Vec<TaskDetail>> {
        let mut out = Vec::with_capacity(rows.len());
        for task in rows {
            out.push(self.hydrate_detail(task).await?);
        }
        Ok(out)
    }
}
