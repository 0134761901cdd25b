//! Room event model.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Event type carrying a room message.
pub const MESSAGE_EVENT_TYPE: &str = "m.room.message";

/// Event type for redactions; never relevant to moderation and excluded
/// from both sync and backfill.
pub const REDACTION_EVENT_TYPE: &str = "m.room.redaction";

/// A single timeline event as delivered by the chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Globally unique event identifier, also used as the action id for
    /// any corrective work derived from this event.
    pub event_id: String,

    /// Present on events fetched via backwards pagination; sync timeline
    /// events omit it because the surrounding batch carries the room id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    pub sender: String,

    /// Event type, e.g. `m.room.message`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Milliseconds since the UNIX epoch, as stamped by the origin server.
    #[serde(default)]
    pub origin_server_ts: i64,

    #[serde(default)]
    pub content: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

impl RoomEvent {
    /// Message subtype (`m.image`, `m.video`, ...) for message events.
    pub fn msgtype(&self) -> Option<&str> {
        self.content.get("msgtype").and_then(|v| v.as_str())
    }

    /// Plain-text body for message events.
    pub fn body(&self) -> Option<&str> {
        self.content.get("body").and_then(|v| v.as_str())
    }

    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_EVENT_TYPE
    }

    /// Origin timestamp as a UTC datetime, when within chrono's range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.origin_server_ts).single()
    }
}
