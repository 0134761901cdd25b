//! Timeline batches and sync updates delivered by the chat backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::event::RoomEvent;

/// New timeline events for one room, as delivered by one sync cycle.
///
/// When the backend could not deliver the full set of new events it marks
/// the batch `truncated` and supplies a continuation token; the reconciler
/// is responsible for backfilling the gap before filters see the batch.
#[derive(Debug, Clone)]
pub struct TimelineBatch {
    pub room_id: String,
    /// Events in the chronological order the backend provides.
    pub events: Vec<RoomEvent>,
    /// `limited` on the wire: the delivery was cut short.
    pub truncated: bool,
    /// Continuation token pointing backwards from the start of `events`.
    pub prev_batch: Option<String>,
}

impl TimelineBatch {
    pub fn contains_event(&self, event_id: &str) -> bool {
        self.events.iter().any(|e| e.event_id == event_id)
    }
}

/// A non-timeline account data event (global or per-room).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDataEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Everything one delivery cycle produced: the next checkpoint token,
/// account data pushes, and per-room timeline batches.
#[derive(Debug, Clone, Default)]
pub struct SyncUpdate {
    pub next_batch: String,
    pub account_data: Vec<AccountDataEvent>,
    pub room_account_data: HashMap<String, Vec<AccountDataEvent>>,
    pub batches: Vec<TimelineBatch>,
}

impl SyncUpdate {
    /// Drop batches for the given rooms (the agent's own log/control rooms
    /// must never reach the filters).
    pub fn strip_rooms(&mut self, reserved: &[String]) {
        self.batches.retain(|b| !reserved.contains(&b.room_id));
    }
}

/// One page of a backwards history fetch.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Events ordered newest-first, as the backend returns them.
    pub events: Vec<RoomEvent>,
    /// Token for the next (older) page; `None` when history is exhausted.
    pub next_token: Option<String>,
}
