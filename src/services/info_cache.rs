//! TTL caches for room and member display names used in audit notices.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::ports::ChatClient;

const DISPLAY_NAME_TTL: Duration = Duration::from_secs(5 * 60);
const ROOM_NAME_TTL: Duration = Duration::from_secs(30 * 60);

/// Caches display names so audit notices do not hammer the backend with
/// state lookups. Lookups that fail fall back to the raw id; audit text is
/// best-effort and must never block a corrective action.
pub struct InfoCache {
    client: Arc<dyn ChatClient>,
    display_names: Mutex<HashMap<String, (Instant, String)>>,
    room_names: Mutex<HashMap<String, (Instant, String)>>,
}

impl InfoCache {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            display_names: Mutex::new(HashMap::new()),
            room_names: Mutex::new(HashMap::new()),
        }
    }

    pub async fn display_name(&self, room_id: &str, user_id: &str) -> String {
        let key = format!("{room_id}\t{user_id}");
        if let Some(name) = cached(&self.display_names, &key, DISPLAY_NAME_TTL) {
            return name;
        }

        let name = match self.client.member_display_name(room_id, user_id).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            _ => user_id.to_owned(),
        };

        store(&self.display_names, key, name.clone());
        name
    }

    pub async fn room_name(&self, room_id: &str) -> String {
        if let Some(name) = cached(&self.room_names, room_id, ROOM_NAME_TTL) {
            return name;
        }

        let name = match self.client.room_name(room_id).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            _ => room_id.to_owned(),
        };

        store(&self.room_names, room_id.to_owned(), name.clone());
        name
    }
}

fn cached(
    cache: &Mutex<HashMap<String, (Instant, String)>>,
    key: &str,
    ttl: Duration,
) -> Option<String> {
    let cache = cache.lock().expect("info cache poisoned");
    cache
        .get(key)
        .filter(|(inserted, _)| inserted.elapsed() < ttl)
        .map(|(_, name)| name.clone())
}

fn store(cache: &Mutex<HashMap<String, (Instant, String)>>, key: String, name: String) {
    cache
        .lock()
        .expect("info cache poisoned")
        .insert(key, (Instant::now(), name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventPage, Notice, SyncUpdate};
    use crate::domain::ports::{ClientError, ClientResult, SyncSelector};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        lookups: AtomicUsize,
        name: Option<String>,
    }

    #[async_trait]
    impl ChatClient for CountingClient {
        async fn whoami(&self) -> ClientResult<String> {
            Ok("@warden:example.org".into())
        }

        async fn joined_rooms(&self) -> ClientResult<Vec<String>> {
            Ok(vec![])
        }

        async fn next_update(
            &self,
            _since: Option<&str>,
            _selector: &SyncSelector,
            _timeout_ms: u64,
        ) -> ClientResult<SyncUpdate> {
            Err(ClientError::Http("not used".into()))
        }

        async fn room_messages(
            &self,
            _room_id: &str,
            _from: &str,
            _limit: u32,
            _exclude_types: &[String],
        ) -> ClientResult<EventPage> {
            Err(ClientError::Http("not used".into()))
        }

        async fn redact_event(
            &self,
            _room_id: &str,
            _event_id: &str,
            _reason: &str,
        ) -> ClientResult<String> {
            Err(ClientError::Http("not used".into()))
        }

        async fn send_notice(&self, _room_id: &str, _notice: &Notice) -> ClientResult<String> {
            Ok("$sent".into())
        }

        async fn get_account_data(
            &self,
            _kind: &str,
        ) -> ClientResult<Option<serde_json::Value>> {
            Ok(None)
        }

        async fn set_account_data(
            &self,
            _kind: &str,
            _value: &serde_json::Value,
        ) -> ClientResult<()> {
            Ok(())
        }

        async fn create_private_room(
            &self,
            _name: &str,
            _invite: &[String],
        ) -> ClientResult<String> {
            Ok("!room:example.org".into())
        }

        async fn room_name(&self, _room_id: &str) -> ClientResult<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.name.clone())
        }

        async fn member_display_name(
            &self,
            _room_id: &str,
            _user_id: &str,
        ) -> ClientResult<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.name.clone())
        }
    }

    #[tokio::test]
    async fn caches_room_name_lookups() {
        let client = Arc::new(CountingClient {
            lookups: AtomicUsize::new(0),
            name: Some("General".into()),
        });
        let cache = InfoCache::new(Arc::clone(&client) as Arc<dyn ChatClient>);

        assert_eq!(cache.room_name("!r:example.org").await, "General");
        assert_eq!(cache.room_name("!r:example.org").await, "General");
        assert_eq!(client.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_raw_ids() {
        let client = Arc::new(CountingClient {
            lookups: AtomicUsize::new(0),
            name: None,
        });
        let cache = InfoCache::new(client as Arc<dyn ChatClient>);

        assert_eq!(
            cache.display_name("!r:example.org", "@a:example.org").await,
            "@a:example.org"
        );
        assert_eq!(cache.room_name("!r:example.org").await, "!r:example.org");
    }
}
