//! # Events — Broadcast Bus for Quest Activity
//!
//! A bounded, thread-safe event log that fans entity changes out to every
//! connected WebSocket client so dashboards stay live without polling.
//!
//! ## Event Types
//!
//! | Variant | Emitted When |
//! |---------|-------------|
//! | `TaskCreated` / `TaskUpdated` / `TaskDeleted` | Quest lifecycle changes |
//! | `BossCreated` / `BossUpdated` / `BossDeleted` | Boss roster changes |
//! | `DamageDealt` | A main quest completion drains boss HP |
//! | `FriendJoined` | New assignees join a quest that already had a roster |
//! | `QuestDenied` | An admin sends a submission back |
//! | `RewardRedeemed` | A hero spends XP on a reward |
//!
//! ## Delivery
//!
//! Every emit is recorded in a bounded `VecDeque` (new connections replay it
//! as a snapshot) and pushed through a `tokio::sync::broadcast` channel. Each
//! record gets a monotonic `id` for client-side deduplication.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Entity changes emitted by route handlers and the resolver.
#[derive(Clone, Debug)]
pub enum Event {
    TaskCreated { task: Value },
    TaskUpdated { task: Value },
    TaskDeleted { task_id: i64 },
    BossCreated { boss: Value },
    BossUpdated { boss: Value },
    BossDeleted { boss_id: i64 },
    DamageDealt { boss: Value, damage: i64, task_title: String },
    FriendJoined { task_id: i64, task_title: String, newcomer_count: i64 },
    QuestDenied { task: Value, reason: String },
    RewardRedeemed { username: String, reward_name: String },
}

impl Event {
    fn kind(&self) -> &'static str {
        match self {
            Event::TaskCreated { .. } => "task_created",
            Event::TaskUpdated { .. } => "task_updated",
            Event::TaskDeleted { .. } => "task_deleted",
            Event::BossCreated { .. } => "boss_created",
            Event::BossUpdated { .. } => "boss_updated",
            Event::BossDeleted { .. } => "boss_deleted",
            Event::DamageDealt { .. } => "damage_dealt",
            Event::FriendJoined { .. } => "friend_joined",
            Event::QuestDenied { .. } => "quest_denied",
            Event::RewardRedeemed { .. } => "reward_redeemed",
        }
    }

    fn payload(&self) -> Value {
        match self {
            Event::TaskCreated { task } | Event::TaskUpdated { task } => {
                json!({ "task": task })
            }
            Event::TaskDeleted { task_id } => json!({ "task_id": task_id }),
            Event::BossCreated { boss } | Event::BossUpdated { boss } => {
                json!({ "boss": boss })
            }
            Event::BossDeleted { boss_id } => json!({ "boss_id": boss_id }),
            Event::DamageDealt {
                boss,
                damage,
                task_title,
            } => json!({ "boss": boss, "damage": damage, "task_title": task_title }),
            Event::FriendJoined {
                task_id,
                task_title,
                newcomer_count,
            } => json!({
                "task_id": task_id,
                "task_title": task_title,
                "newcomer_count": newcomer_count,
            }),
            Event::QuestDenied { task, reason } => {
                json!({ "task": task, "reason": reason })
            }
            Event::RewardRedeemed {
                username,
                reward_name,
            } => json!({ "username": username, "reward_name": reward_name }),
        }
    }
}

/// A recorded broadcast, replayed to WS clients on connect.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    pub id: u64,
    pub kind: String,
    pub payload: Value,
    pub timestamp_ms: u64,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

const RECENT_EVENTS_CAP: usize = 100;
const BROADCAST_CAP: usize = 256;

/// Central event bus: handlers emit entity changes, the bus records and
/// broadcasts them to every subscribed WebSocket client.
pub struct EventBus {
    recent: Mutex<VecDeque<EventRecord>>,
    next_id: AtomicU64,
    ws_sender: tokio::sync::broadcast::Sender<String>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (ws_sender, _) = tokio::sync::broadcast::channel(BROADCAST_CAP);
        EventBus {
            recent: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAP)),
            next_id: AtomicU64::new(1),
            ws_sender,
        }
    }

    /// Subscribe to broadcasts (one receiver per WS client). Receivers that
    /// fall behind see `Lagged` and skip ahead.
    pub fn subscribe_ws(&self) -> tokio::sync::broadcast::Receiver<String> {
        self.ws_sender.subscribe()
    }

    /// Record an event and broadcast it. Send failures (no connected
    /// clients) are ignored.
    pub fn emit(&self, event: Event) {
        let record = EventRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind: event.kind().into(),
            payload: event.payload(),
            timestamp_ms: now_ms(),
        };
        tracing::debug!(kind = %record.kind, id = record.id, "event");

        {
            let mut recent = self.recent.lock().unwrap();
            if recent.len() >= RECENT_EVENTS_CAP {
                recent.pop_front();
            }
            recent.push_back(record.clone());
        }

        let message = json!({
            "type": record.kind,
            "id": record.id,
            "timestamp_ms": record.timestamp_ms,
            "payload": record.payload,
        });
        let _ = self.ws_sender.send(message.to_string());
    }

    /// Recent events for new WS connections, most recent first.
    pub fn recent_events(&self, limit: usize) -> Vec<EventRecord> {
        let recent = self.recent.lock().unwrap();
        recent.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bus() -> EventBus {
        EventBus::new()
    }

    #[test]
    fn new_event_bus_has_no_events() {
        let bus = make_bus();
        assert!(bus.recent_events(100).is_empty());
    }

    #[test]
    fn emit_records_kind_and_payload() {
        let bus = make_bus();
        bus.emit(Event::TaskDeleted { task_id: 42 });
        let events = bus.recent_events(100);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "task_deleted");
        assert_eq!(events[0].payload["task_id"], 42);
    }

    #[test]
    fn emit_reaches_subscribers() {
        let bus = make_bus();
        let mut rx = bus.subscribe_ws();
        bus.emit(Event::FriendJoined {
            task_id: 3,
            task_title: "Slay the backlog".into(),
            newcomer_count: 2,
        });
        let msg = rx.try_recv().unwrap();
        let parsed: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "friend_joined");
        assert_eq!(parsed["payload"]["newcomer_count"], 2);
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = make_bus();
        bus.emit(Event::BossDeleted { boss_id: 7 });
        assert_eq!(bus.recent_events(10).len(), 1);
    }

    #[test]
    fn damage_dealt_payload_carries_boss_and_damage() {
        let bus = make_bus();
        bus.emit(Event::DamageDealt {
            boss: json!({ "id": 1, "current_hp": 5 }),
            damage: 15,
            task_title: "Slay the backlog".into(),
        });
        let events = bus.recent_events(10);
        assert_eq!(events[0].kind, "damage_dealt");
        assert_eq!(events[0].payload["damage"], 15);
        assert_eq!(events[0].payload["boss"]["current_hp"], 5);
    }

    #[test]
    fn recent_events_capped() {
        let bus = make_bus();
        for i in 0..150 {
            bus.emit(Event::TaskDeleted { task_id: i });
        }
        let events = bus.recent_events(500);
        assert_eq!(events.len(), RECENT_EVENTS_CAP);
    }

    #[test]
    fn recent_events_returns_most_recent_first() {
        let bus = make_bus();
        bus.emit(Event::TaskDeleted { task_id: 1 });
        bus.emit(Event::TaskDeleted { task_id: 2 });
        let events = bus.recent_events(10);
        assert_eq!(events[0].payload["task_id"], 2);
        assert!(events[0].id > events[1].id);
    }
}
