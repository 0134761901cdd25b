//! Chat backend port - interface to the homeserver.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{EventPage, Notice, SyncUpdate};

/// Errors surfaced by a chat backend implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("backend rejected the request ({status}) {errcode}: {message}")]
    Api {
        status: u16,
        errcode: String,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("unexpected response body: {0}")]
    Malformed(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// What a delivery cycle should include and exclude.
///
/// Serialized into the backend's inline sync filter; the log and control
/// rooms are excluded server-side, and redactions are never delivered.
#[derive(Debug, Clone, Default)]
pub struct SyncSelector {
    pub exclude_rooms: Vec<String>,
    pub exclude_types: Vec<String>,
    pub timeline_limit: u32,
}

/// Interface to the chat backend.
///
/// The agent owns no wire format; implementations map these calls onto the
/// actual client-server API and translate failures into [`ClientError`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Fully qualified user id of the authenticated account.
    async fn whoami(&self) -> ClientResult<String>;

    /// Rooms the account is currently joined to.
    async fn joined_rooms(&self) -> ClientResult<Vec<String>>;

    /// Long-poll for the next delivery cycle.
    async fn next_update(
        &self,
        since: Option<&str>,
        selector: &SyncSelector,
        timeout_ms: u64,
    ) -> ClientResult<SyncUpdate>;

    /// Fetch up to `limit` historical events backwards from `from`,
    /// excluding the given event types. Events come back newest-first.
    async fn room_messages(
        &self,
        room_id: &str,
        from: &str,
        limit: u32,
        exclude_types: &[String],
    ) -> ClientResult<EventPage>;

    /// Redact an event; returns the redaction's event id.
    async fn redact_event(
        &self,
        room_id: &str,
        event_id: &str,
        reason: &str,
    ) -> ClientResult<String>;

    /// Send an `m.notice` message; returns the sent event id.
    async fn send_notice(&self, room_id: &str, notice: &Notice) -> ClientResult<String>;

    /// Read an account data blob; `Ok(None)` when it has never been set.
    async fn get_account_data(&self, kind: &str) -> ClientResult<Option<serde_json::Value>>;

    async fn set_account_data(&self, kind: &str, value: &serde_json::Value) -> ClientResult<()>;

    /// Create a private room, inviting the given users. Returns the room id.
    async fn create_private_room(&self, name: &str, invite: &[String]) -> ClientResult<String>;

    /// Display name of the room, when it has one.
    async fn room_name(&self, room_id: &str) -> ClientResult<Option<String>>;

    /// Display name of a member within a room, when set.
    async fn member_display_name(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> ClientResult<Option<String>>;
}
