//! Completion resolver.
//!
//! The single place where a DONE transition (and its reverse) turns into
//! boss damage and XP. Routes guard idempotency by only calling the forward
//! path when the old status is not DONE and the reverse path when it is, so
//! a re-save of an already-DONE task never re-applies.
//!
//! Boss HP writes go through the versioned update in `db::bosses`; a stale
//! version means another completion landed first and the caller gets a 409
//! instead of a lost update.

use crate::db::{BossRow, Database, TaskRow, UserRow};
use crate::emitter;
use crate::error::ApiError;
use crate::events::{Event, EventBus};
use crate::ledger;
use crate::model::{CommentKind, HeroClass, Label, Priority};
use serde_json::json;

/// Tunable game rules.
#[derive(Clone, Copy)]
pub struct Settings {
    /// How many level-ups a single XP award may trigger. The original game
    /// balance allows one; raising it lets large awards cascade.
    pub max_level_ups_per_award: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_level_ups_per_award: 1,
        }
    }
}

/// Per-request capability bundle passed into every resolver call.
pub struct Ctx<'a> {
    pub db: &'a Database,
    pub events: &'a EventBus,
    pub actor: &'a UserRow,
    pub settings: Settings,
}

/// Highest applicable class bonus across the roster. Bonuses never stack;
/// only the single best one applies.
pub fn damage_multiplier(assignees: &[UserRow], priority: Priority, label: Label) -> f64 {
    let mut multiplier = 1.0f64;
    for assignee in assignees {
        match assignee.hero_class() {
            Some(HeroClass::Warrior) if priority == Priority::High => {
                multiplier = multiplier.max(1.5);
            }
            Some(HeroClass::Rogue) if label == Label::Bug => {
                multiplier = multiplier.max(2.0);
            }
            _ => {}
        }
    }
    multiplier
}

pub fn final_damage(boss_damage: i64, multiplier: f64) -> i64 {
    (boss_damage as f64 * multiplier).floor() as i64
}

/// Apply an XP award to (xp, level). Clerics gain 20% extra, floored.
/// Level-ups carry the overflow down but are capped per award.
pub fn award_xp(
    xp: i64,
    level: i64,
    reward: i64,
    is_cleric: bool,
    max_level_ups: u32,
) -> (i64, i64) {
    let gain = if is_cleric {
        (reward as f64 * 1.2).floor() as i64
    } else {
        reward
    };
    let mut xp = xp + gain;
    let mut level = level;
    let mut ups = 0;
    while ups < max_level_ups && xp >= level * 100 {
        level += 1;
        xp -= (level - 1) * 100;
        ups += 1;
    }
    (xp, level)
}

fn task_multiplier(task: &TaskRow, assignees: &[UserRow]) -> Result<f64, ApiError> {
    let priority = Priority::parse(&task.priority)
        .ok_or_else(|| ApiError::Validation(format!("unknown priority {:?}", task.priority)))?;
    let label = Label::parse(&task.label)
        .ok_or_else(|| ApiError::Validation(format!("unknown label {:?}", task.label)))?;
    Ok(damage_multiplier(assignees, priority, label))
}

/// Forward path: task left a non-DONE status and arrived at DONE.
pub async fn resolve_forward(
    ctx: &Ctx<'_>,
    task: &TaskRow,
    assignees: &[UserRow],
) -> Result<(), ApiError> {
    // Main quests drain boss HP; side quests never do.
    let mut hp_write: Option<(BossRow, i64)> = None;
    if task.is_main_quest() && task.boss_damage > 0 {
        if let Some(boss_id) = task.boss_id {
            let boss = ctx
                .db
                .get_boss(boss_id)
                .await?
                .ok_or(ApiError::NotFound("boss"))?;
            let damage = final_damage(task.boss_damage, task_multiplier(task, assignees)?);
            let new_hp = ledger::apply_damage(boss.current_hp, damage);
            let updated = ctx
                .db
                .set_boss_hp_checked(boss.id, new_hp, boss.version)
                .await?
                .ok_or_else(|| {
                    ApiError::Conflict("boss was modified concurrently, retry".into())
                })?;
            tracing::info!(
                boss_id = updated.id,
                damage,
                current_hp = updated.current_hp,
                task_id = task.id,
                "damage dealt"
            );
            hp_write = Some((updated, damage));
        }
    }

    if task.xp_reward > 0 {
        for assignee in assignees {
            let is_cleric = assignee.hero_class() == Some(HeroClass::Cleric);
            let (xp, level) = award_xp(
                assignee.xp,
                assignee.level,
                task.xp_reward,
                is_cleric,
                ctx.settings.max_level_ups_per_award,
            );
            ctx.db.set_user_progress(assignee.id, xp, level).await?;
            if level > assignee.level {
                tracing::info!(user_id = assignee.id, level, "level up");
            }
        }
    }

    if let Some(reply) = task.admin_reply.as_deref().filter(|r| !r.is_empty()) {
        ctx.db
            .insert_comment(task.id, ctx.actor.id, reply, CommentKind::Approval.as_str())
            .await?;
    }

    // Durable rows first, broadcasts last.
    emitter::quest_completed(ctx.db, task, assignees).await?;

    if let Some((updated, damage)) = hp_write {
        let boss_json = serde_json::to_value(&updated).unwrap_or(json!({}));
        ctx.events.emit(Event::DamageDealt {
            boss: boss_json.clone(),
            damage,
            task_title: task.title.clone(),
        });
        ctx.events.emit(Event::BossUpdated { boss: boss_json });
    }
    Ok(())
}

/// Reverse path: DONE back to IN_PROGRESS. Restores the damage that the
/// *current* roster would deal; if assignees changed since completion the
/// restored amount can differ from what was subtracted. XP is never
/// reclaimed.
pub async fn resolve_reopen(
    ctx: &Ctx<'_>,
    task: &TaskRow,
    assignees: &[UserRow],
) -> Result<(), ApiError> {
    if task.is_main_quest() && task.boss_damage > 0 {
        if let Some(boss_id) = task.boss_id {
            let boss = ctx
                .db
                .get_boss(boss_id)
                .await?
                .ok_or(ApiError::NotFound("boss"))?;
            let damage = final_damage(task.boss_damage, task_multiplier(task, assignees)?);
            let new_hp = ledger::restore_hp(boss.current_hp, boss.total_hp, damage);
            let updated = ctx
                .db
                .set_boss_hp_checked(boss.id, new_hp, boss.version)
                .await?
                .ok_or_else(|| {
                    ApiError::Conflict("boss was modified concurrently, retry".into())
                })?;
            ctx.events.emit(Event::BossUpdated {
                boss: serde_json::to_value(&updated).unwrap_or(json!({})),
            });
            tracing::info!(
                boss_id = updated.id,
                restored = damage,
                current_hp = updated.current_hp,
                task_id = task.id,
                "quest reopened"
            );
        }
    }
    Ok(())
}

/// Denial path: admin sends a PENDING_REVIEW submission back to
/// IN_PROGRESS. A non-empty reply is required.
pub async fn resolve_denial(
    ctx: &Ctx<'_>,
    task: &TaskRow,
    reply: &str,
) -> Result<(), ApiError> {
    if reply.trim().is_empty() {
        return Err(ApiError::Validation(
            "a denial requires an admin reply explaining what to fix".into(),
        ));
    }
    ctx.db
        .insert_comment(task.id, ctx.actor.id, reply, CommentKind::Denial.as_str())
        .await?;
    emitter::quest_denied(ctx.db, task).await?;
    ctx.events.emit(Event::QuestDenied {
        task: serde_json::to_value(task).unwrap_or(json!({})),
        reason: reply.to_string(),
    });
    Ok(())
}

/// Submission path: status moved to PENDING_REVIEW. A completion comment
/// becomes a PROOF_OF_WORK entry in the activity feed, and admins are asked
/// to review.
pub async fn resolve_submission(ctx: &Ctx<'_>, task: &TaskRow) -> Result<(), ApiError> {
    if let Some(comment) = task.completion_comment.as_deref().filter(|c| !c.is_empty()) {
        ctx.db
            .insert_comment(
                task.id,
                ctx.actor.id,
                comment,
                CommentKind::ProofOfWork.as_str(),
            )
            .await?;
    }
    emitter::review_requested(ctx.db, task, &ctx.actor.username).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero(id: i64, class: &str) -> UserRow {
        UserRow {
            id,
            username: format!("hero{}", id),
            password_hash: "x".into(),
            class: class.into(),
            role: "USER".into(),
            xp: 0,
            level: 1,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn warrior_on_high_priority_multiplies_1_5() {
        let roster = vec![hero(1, "Warrior")];
        assert_eq!(
            damage_multiplier(&roster, Priority::High, Label::Feature),
            1.5
        );
        assert_eq!(
            damage_multiplier(&roster, Priority::Medium, Label::Feature),
            1.0
        );
    }

    #[test]
    fn rogue_on_bug_multiplies_2_0() {
        let roster = vec![hero(1, "Rogue")];
        assert_eq!(damage_multiplier(&roster, Priority::Low, Label::Bug), 2.0);
        assert_eq!(
            damage_multiplier(&roster, Priority::Low, Label::Feature),
            1.0
        );
    }

    #[test]
    fn multipliers_take_max_never_stack() {
        let roster = vec![hero(1, "Warrior"), hero(2, "Rogue")];
        assert_eq!(damage_multiplier(&roster, Priority::High, Label::Bug), 2.0);
    }

    #[test]
    fn mage_has_no_damage_bonus() {
        let roster = vec![hero(1, "Mage")];
        assert_eq!(damage_multiplier(&roster, Priority::High, Label::Bug), 1.0);
    }

    #[test]
    fn final_damage_floors() {
        assert_eq!(final_damage(7, 1.5), 10);
        assert_eq!(final_damage(20, 1.5), 30);
        assert_eq!(final_damage(3, 1.0), 3);
    }

    #[test]
    fn cleric_level_up_carries_overflow() {
        // Level 1 at 90 xp, reward 10: cleric gain 12, crosses 100.
        let (xp, level) = award_xp(90, 1, 10, true, 1);
        assert_eq!(level, 2);
        assert_eq!(xp, 2);
    }

    #[test]
    fn non_cleric_gets_flat_reward() {
        let (xp, level) = award_xp(0, 1, 10, false, 1);
        assert_eq!((xp, level), (10, 1));
    }

    #[test]
    fn level_up_capped_at_one_by_default() {
        // 1000 xp at level 1 would justify several levels, only one applies.
        let (xp, level) = award_xp(0, 1, 1000, false, 1);
        assert_eq!(level, 2);
        assert_eq!(xp, 900);
    }

    #[test]
    fn raising_the_cap_lets_level_ups_cascade() {
        let (xp, level) = award_xp(0, 1, 1000, false, 10);
        // 1000 -> lvl2 (−100) 900 -> lvl3 (−200) 700 -> lvl4 (−300) 400
        // -> 400 >= 400 -> lvl5 (−400) 0
        assert_eq!(level, 5);
        assert_eq!(xp, 0);
    }

    #[test]
    fn award_below_threshold_never_levels() {
        let (xp, level) = award_xp(50, 1, 10, false, 1);
        assert_eq!((xp, level), (60, 1));
    }
}
