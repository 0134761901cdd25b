//! Wire types for the Matrix client-server API.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::models::{AccountDataEvent, RoomEvent, SyncUpdate, TimelineBatch};

#[derive(Debug, Default, Deserialize)]
pub struct EventContainer {
    #[serde(default)]
    pub events: Vec<AccountDataEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RoomEvent>,
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub prev_batch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub account_data: Option<EventContainer>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rooms {
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
}

#[derive(Debug, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub account_data: Option<EventContainer>,
    #[serde(default)]
    pub rooms: Option<Rooms>,
}

impl SyncResponse {
    /// Flatten the wire shape into the domain's delivery-cycle view.
    pub fn into_update(self) -> SyncUpdate {
        let mut update = SyncUpdate {
            next_batch: self.next_batch,
            account_data: self.account_data.map(|c| c.events).unwrap_or_default(),
            ..Default::default()
        };

        for (room_id, room) in self.rooms.map(|r| r.join).unwrap_or_default() {
            if let Some(container) = room.account_data {
                if !container.events.is_empty() {
                    update
                        .room_account_data
                        .insert(room_id.clone(), container.events);
                }
            }
            if let Some(timeline) = room.timeline {
                update.batches.push(TimelineBatch {
                    room_id,
                    events: timeline.events,
                    truncated: timeline.limited,
                    prev_batch: timeline.prev_batch,
                });
            }
        }

        update
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub chunk: Vec<RoomEvent>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WhoamiResponse {
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinedRoomsResponse {
    #[serde(default)]
    pub joined_rooms: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errcode: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub retry_after_ms: Option<u64>,
}
