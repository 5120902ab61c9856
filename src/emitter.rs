//! Durable notification fan-out.
//!
//! Every transition that someone should hear about gets a per-user
//! notification row here. Rows are written before any live broadcast so a
//! user who was offline still sees the history when they fetch their feed.

use crate::db::{Database, TaskRow, UserRow};
use crate::error::ApiError;
use crate::model::NotificationKind;

/// Newly-added assignees are told about their quest; if the quest already
/// had a roster, the veterans hear a new friend joined.
pub async fn assignment(
    db: &Database,
    task: &TaskRow,
    added: &[i64],
    existing: &[i64],
) -> Result<(), ApiError> {
    if added.is_empty() {
        return Ok(());
    }
    let message = format!("You have been assigned to \"{}\"", task.title);
    db.insert_notifications(added, &message, NotificationKind::Assignment.as_str())
        .await?;

    if !existing.is_empty() {
        let veterans: Vec<i64> = existing
            .iter()
            .copied()
            .filter(|id| !added.contains(id))
            .collect();
        let message = format!("New party members joined \"{}\"", task.title);
        db.insert_notifications(&veterans, &message, NotificationKind::Social.as_str())
            .await?;
    }
    Ok(())
}

/// Success notice for every assignee, plus admins who were not on the quest.
pub async fn quest_completed(
    db: &Database,
    task: &TaskRow,
    assignees: &[UserRow],
) -> Result<(), ApiError> {
    let assignee_ids: Vec<i64> = assignees.iter().map(|u| u.id).collect();
    let message = format!("Quest \"{}\" completed!", task.title);
    db.insert_notifications(&assignee_ids, &message, NotificationKind::Success.as_str())
        .await?;

    let admin_ids: Vec<i64> = db
        .list_admin_ids()
        .await?
        .into_iter()
        .filter(|id| !assignee_ids.contains(id))
        .collect();
    db.insert_notifications(&admin_ids, &message, NotificationKind::Success.as_str())
        .await?;
    Ok(())
}

/// Denial notice to the lead assignee, who owns fixing the submission.
pub async fn quest_denied(db: &Database, task: &TaskRow) -> Result<(), ApiError> {
    if let Some(lead_id) = task.lead_assignee_id {
        let message = format!("Quest \"{}\" was sent back for rework", task.title);
        db.insert_notification(lead_id, &message, NotificationKind::Denied.as_str())
            .await?;
    }
    Ok(())
}

/// Review request to every admin when a submission lands in PENDING_REVIEW.
pub async fn review_requested(
    db: &Database,
    task: &TaskRow,
    submitter: &str,
) -> Result<(), ApiError> {
    let admin_ids = db.list_admin_ids().await?;
    let message = format!("{} submitted \"{}\" for review", submitter, task.title);
    db.insert_notifications(&admin_ids, &message, NotificationKind::Review.as_str())
        .await?;
    Ok(())
}

/// Redemption notice to admins, who fulfill the reward.
pub async fn reward_redeemed(
    db: &Database,
    username: &str,
    reward_name: &str,
) -> Result<(), ApiError> {
    let admin_ids = db.list_admin_ids().await?;
    let message = format!("{} redeemed \"{}\"", username, reward_name);
    db.insert_notifications(&admin_ids, &message, NotificationKind::Reward.as_str())
        .await?;
    Ok(())
}
