//! Shared test doubles for the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use roomwarden::domain::models::{EventPage, SyncUpdate};
use roomwarden::domain::ports::{ClientError, ClientResult, SyncSelector};
use roomwarden::{ChatClient, Notice, RoomEvent};

/// Scriptable in-memory chat backend.
///
/// Sync updates are served from a queue; when the script runs dry,
/// `next_update` parks until the test shuts the agent down. Everything the
/// agent does (redactions, notices, account data writes, room creations)
/// is recorded for assertions.
#[derive(Default)]
pub struct MockChatClient {
    pub user_id: String,
    sync_script: Mutex<VecDeque<SyncUpdate>>,
    history: Mutex<HashMap<String, VecDeque<EventPage>>>,
    pub redactions: Mutex<Vec<(String, String, String)>>,
    pub notices: Mutex<Vec<(String, Notice)>>,
    pub account_data: Mutex<HashMap<String, serde_json::Value>>,
    pub created_rooms: Mutex<Vec<String>>,
    pub joined: Mutex<Vec<String>>,
    room_counter: AtomicUsize,
    /// Redactions of these event ids fail this many times before working.
    pub flaky_redactions: Mutex<HashMap<String, usize>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            user_id: "@warden:example.org".to_string(),
            ..Default::default()
        }
    }

    pub fn push_sync(&self, update: SyncUpdate) {
        self.sync_script.lock().unwrap().push_back(update);
    }

    pub fn push_history(&self, room_id: &str, page: EventPage) {
        self.history
            .lock()
            .unwrap()
            .entry(room_id.to_string())
            .or_default()
            .push_back(page);
    }

    pub fn redacted_ids(&self) -> Vec<String> {
        self.redactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event_id, _)| event_id.clone())
            .collect()
    }

    pub fn notice_bodies(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, notice)| notice.body.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn whoami(&self) -> ClientResult<String> {
        Ok(self.user_id.clone())
    }

    async fn joined_rooms(&self) -> ClientResult<Vec<String>> {
        Ok(self.joined.lock().unwrap().clone())
    }

    async fn next_update(
        &self,
        _since: Option<&str>,
        _selector: &SyncSelector,
        _timeout_ms: u64,
    ) -> ClientResult<SyncUpdate> {
        let next = self.sync_script.lock().unwrap().pop_front();
        match next {
            Some(update) => Ok(update),
            None => {
                // script exhausted: behave like a quiet homeserver
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ClientError::Http("script exhausted".into()))
            }
        }
    }

    async fn room_messages(
        &self,
        room_id: &str,
        _from: &str,
        _limit: u32,
        _exclude_types: &[String],
    ) -> ClientResult<EventPage> {
        let page = self
            .history
            .lock()
            .unwrap()
            .get_mut(room_id)
            .and_then(VecDeque::pop_front);
        match page {
            Some(page) => Ok(page),
            None => Err(ClientError::Http(format!(
                "no history scripted for {room_id}"
            ))),
        }
    }

    async fn redact_event(
        &self,
        room_id: &str,
        event_id: &str,
        reason: &str,
    ) -> ClientResult<String> {
        {
            let mut flaky = self.flaky_redactions.lock().unwrap();
            if let Some(failures) = flaky.get_mut(event_id) {
                if *failures > 0 {
                    *failures -= 1;
                    return Err(ClientError::Http("simulated outage".into()));
                }
            }
        }

        self.redactions.lock().unwrap().push((
            room_id.to_string(),
            event_id.to_string(),
            reason.to_string(),
        ));
        Ok(format!("$redaction-of-{event_id}"))
    }

    async fn send_notice(&self, room_id: &str, notice: &Notice) -> ClientResult<String> {
        self.notices
            .lock()
            .unwrap()
            .push((room_id.to_string(), notice.clone()));
        Ok("$notice".to_string())
    }

    async fn get_account_data(&self, kind: &str) -> ClientResult<Option<serde_json::Value>> {
        Ok(self.account_data.lock().unwrap().get(kind).cloned())
    }

    async fn set_account_data(&self, kind: &str, value: &serde_json::Value) -> ClientResult<()> {
        self.account_data
            .lock()
            .unwrap()
            .insert(kind.to_string(), value.clone());
        Ok(())
    }

    async fn create_private_room(&self, name: &str, _invite: &[String]) -> ClientResult<String> {
        let n = self.room_counter.fetch_add(1, Ordering::SeqCst);
        let room_id = format!("!created-{n}:example.org");
        self.created_rooms.lock().unwrap().push(name.to_string());
        Ok(room_id)
    }

    async fn room_name(&self, _room_id: &str) -> ClientResult<Option<String>> {
        Ok(None)
    }

    async fn member_display_name(
        &self,
        _room_id: &str,
        _user_id: &str,
    ) -> ClientResult<Option<String>> {
        Ok(None)
    }
}

/// A message event for tests.
pub fn message_event(id: &str, sender: &str, msgtype: &str) -> RoomEvent {
    serde_json::from_value(serde_json::json!({
        "event_id": id,
        "sender": sender,
        "type": "m.room.message",
        "origin_server_ts": 1_700_000_000_000_i64,
        "content": {"msgtype": msgtype, "body": "payload"}
    }))
    .unwrap()
}
