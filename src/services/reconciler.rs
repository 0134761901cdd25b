//! Timeline reconciliation for truncated batches.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{TimelineBatch, REDACTION_EVENT_TYPE};
use crate::domain::ports::ChatClient;

/// Completes truncated timeline batches by backfilling the delivery gap
/// through backwards pagination, merging by event id.
pub struct TimelineReconciler {
    client: Arc<dyn ChatClient>,
    backfill_limit: u32,
    excluded_types: Vec<String>,
}

impl TimelineReconciler {
    pub fn new(client: Arc<dyn ChatClient>, backfill_limit: u32) -> Self {
        Self {
            client,
            backfill_limit,
            excluded_types: vec![REDACTION_EVENT_TYPE.to_string()],
        }
    }

    /// Backfill one truncated batch in place.
    ///
    /// Fetched events are older than everything already delivered, so after
    /// deduplication they are prepended in the chronological order the
    /// backend provides. Running this twice on the same batch is a no-op:
    /// every id from the first pass is already present.
    ///
    /// Returns the number of events merged in.
    #[instrument(skip(self, batch), fields(room_id = %batch.room_id))]
    pub async fn reconcile(&self, batch: &mut TimelineBatch) -> DomainResult<usize> {
        if !batch.truncated {
            return Ok(0);
        }

        let Some(from) = batch.prev_batch.clone() else {
            debug!("truncated batch without continuation token, nothing to backfill");
            return Ok(0);
        };

        let page = self
            .client
            .room_messages(&batch.room_id, &from, self.backfill_limit, &self.excluded_types)
            .await
            .map_err(|err| DomainError::BackfillFailed {
                room_id: batch.room_id.clone(),
                reason: err.to_string(),
            })?;

        let mut known: HashSet<String> =
            batch.events.iter().map(|e| e.event_id.clone()).collect();

        // page arrives newest-first; collect the unseen remainder and flip
        // it back into chronological order
        let mut fetched = Vec::new();
        for event in page.events {
            if self.excluded_types.contains(&event.kind) {
                continue;
            }
            if known.insert(event.event_id.clone()) {
                fetched.push(event);
            }
        }
        fetched.reverse();

        let merged = fetched.len();
        if merged > 0 {
            fetched.append(&mut batch.events);
            batch.events = fetched;
        }

        debug!(merged, "timeline batch reconciled");
        Ok(merged)
    }

    /// Reconcile every truncated batch of a cycle concurrently.
    ///
    /// A failed backfill aborts only that room's reconciliation: the batch
    /// stays as delivered, and the returned failure list lets the caller
    /// audit each room separately. The next delivery cycle's checkpoint
    /// re-surfaces anything still missed.
    pub async fn reconcile_all(
        &self,
        batches: &mut [TimelineBatch],
    ) -> Vec<(String, DomainError)> {
        let results = join_all(batches.iter_mut().filter(|b| b.truncated).map(|batch| {
            let room_id = batch.room_id.clone();
            async move { (room_id, self.reconcile(batch).await) }
        }))
        .await;

        let mut failures = Vec::new();
        for (room_id, result) in results {
            if let Err(err) = result {
                warn!(room_id = %room_id, "processing batch as-is: {err}");
                failures.push((room_id, err));
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventPage, Notice, RoomEvent, SyncUpdate};
    use crate::domain::ports::{ClientError, ClientResult, SyncSelector};
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Chat {}

        #[async_trait::async_trait]
        impl ChatClient for Chat {
            async fn whoami(&self) -> ClientResult<String>;
            async fn joined_rooms(&self) -> ClientResult<Vec<String>>;
            #[mockall::concretize]
            async fn next_update(
                &self,
                since: Option<&str>,
                selector: &SyncSelector,
                timeout_ms: u64,
            ) -> ClientResult<SyncUpdate>;
            async fn room_messages(
                &self,
                room_id: &str,
                from: &str,
                limit: u32,
                exclude_types: &[String],
            ) -> ClientResult<EventPage>;
            async fn redact_event(
                &self,
                room_id: &str,
                event_id: &str,
                reason: &str,
            ) -> ClientResult<String>;
            async fn send_notice(&self, room_id: &str, notice: &Notice) -> ClientResult<String>;
            async fn get_account_data(&self, kind: &str) -> ClientResult<Option<serde_json::Value>>;
            async fn set_account_data(&self, kind: &str, value: &serde_json::Value) -> ClientResult<()>;
            async fn create_private_room(&self, name: &str, invite: &[String]) -> ClientResult<String>;
            async fn room_name(&self, room_id: &str) -> ClientResult<Option<String>>;
            async fn member_display_name(
                &self,
                room_id: &str,
                user_id: &str,
            ) -> ClientResult<Option<String>>;
        }
    }

    fn event(id: &str, ts: i64) -> RoomEvent {
        serde_json::from_value(json!({
            "event_id": id,
            "sender": "@a:example.org",
            "type": "m.room.message",
            "origin_server_ts": ts,
            "content": {"msgtype": "m.text", "body": "x"}
        }))
        .unwrap()
    }

    fn redaction(id: &str) -> RoomEvent {
        serde_json::from_value(json!({
            "event_id": id,
            "sender": "@a:example.org",
            "type": "m.room.redaction",
            "content": {}
        }))
        .unwrap()
    }

    fn truncated_batch() -> TimelineBatch {
        TimelineBatch {
            room_id: "!spam:example.org".into(),
            events: vec![event("$40", 40), event("$50", 50)],
            truncated: true,
            prev_batch: Some("t-before-40".into()),
        }
    }

    #[tokio::test]
    async fn merges_backfill_before_delivered_events() {
        let mut client = MockChat::new();
        client.expect_room_messages().times(1).returning(|_, _, _, _| {
            Ok(EventPage {
                // newest-first, as the backend returns them
                events: vec![event("$30", 30), event("$20", 20), event("$10", 10)],
                next_token: Some("t-before-10".into()),
            })
        });

        let reconciler = TimelineReconciler::new(Arc::new(client), 500);
        let mut batch = truncated_batch();
        let merged = reconciler.reconcile(&mut batch).await.unwrap();

        assert_eq!(merged, 3);
        let ids: Vec<_> = batch.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["$10", "$20", "$30", "$40", "$50"]);
    }

    #[tokio::test]
    async fn merge_is_idempotent_and_deduplicates() {
        let mut client = MockChat::new();
        client.expect_room_messages().times(2).returning(|_, _, _, _| {
            Ok(EventPage {
                // overlaps with an event the batch already holds
                events: vec![event("$40", 40), event("$30", 30)],
                next_token: None,
            })
        });

        let reconciler = TimelineReconciler::new(Arc::new(client), 500);
        let mut batch = truncated_batch();

        let first = reconciler.reconcile(&mut batch).await.unwrap();
        assert_eq!(first, 1);
        let after_first: Vec<_> = batch.events.iter().map(|e| e.event_id.clone()).collect();

        let second = reconciler.reconcile(&mut batch).await.unwrap();
        assert_eq!(second, 0);
        let after_second: Vec<_> = batch.events.iter().map(|e| e.event_id.clone()).collect();
        assert_eq!(after_first, after_second);

        // no duplicate ids anywhere
        let unique: HashSet<_> = after_second.iter().collect();
        assert_eq!(unique.len(), after_second.len());
    }

    #[tokio::test]
    async fn skips_excluded_event_types() {
        let mut client = MockChat::new();
        client.expect_room_messages().times(1).returning(|_, _, _, _| {
            Ok(EventPage {
                events: vec![redaction("$r1"), event("$30", 30)],
                next_token: None,
            })
        });

        let reconciler = TimelineReconciler::new(Arc::new(client), 500);
        let mut batch = truncated_batch();
        let merged = reconciler.reconcile(&mut batch).await.unwrap();

        assert_eq!(merged, 1);
        assert!(!batch.contains_event("$r1"));
    }

    #[tokio::test]
    async fn non_truncated_batch_is_untouched() {
        let client = MockChat::new(); // no expectations: any call would panic
        let reconciler = TimelineReconciler::new(Arc::new(client), 500);

        let mut batch = TimelineBatch {
            truncated: false,
            ..truncated_batch()
        };
        let merged = reconciler.reconcile(&mut batch).await.unwrap();
        assert_eq!(merged, 0);
        assert_eq!(batch.events.len(), 2);
    }

    #[tokio::test]
    async fn failed_room_does_not_abort_others() {
        let mut client = MockChat::new();
        client
            .expect_room_messages()
            .times(2)
            .returning(|room_id, _, _, _| {
                if room_id == "!broken:example.org" {
                    Err(ClientError::Http("connection reset".into()))
                } else {
                    Ok(EventPage {
                        events: vec![event("$5", 5)],
                        next_token: None,
                    })
                }
            });

        let reconciler = TimelineReconciler::new(Arc::new(client), 500);
        let mut batches = vec![
            TimelineBatch {
                room_id: "!broken:example.org".into(),
                ..truncated_batch()
            },
            truncated_batch(),
        ];

        let failures = reconciler.reconcile_all(&mut batches).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "!broken:example.org");

        // the broken room kept its delivered events; the healthy one merged
        assert_eq!(batches[0].events.len(), 2);
        assert_eq!(batches[1].events.len(), 3);
    }
}
