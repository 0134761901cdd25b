//! Media attachment filter, parameterized by content category.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, instrument};

use crate::domain::models::{
    Action, ActionFuture, ContentCategory, Notice, RetryPolicy, RoomEvent, TimelineBatch,
};
use crate::domain::ports::{ChatClient, ContentFilter};
use crate::services::action_queue::ActionQueue;
use crate::services::config_resolver::ConfigResolver;
use crate::services::dispatch_queue::DispatchQueue;
use crate::services::info_cache::InfoCache;

/// Redacts disallowed media messages of one category (image, video, audio
/// or file) and audits each removal to the log room.
///
/// One instance per category participates in the fan-out; the category
/// decides which message `msgtype` the filter reacts to and which
/// configuration section governs it.
pub struct AttachmentFilter {
    name: String,
    category: ContentCategory,
    client: Arc<dyn ChatClient>,
    resolver: Arc<ConfigResolver>,
    actions: Arc<dyn ActionQueue>,
    dispatch: Arc<DispatchQueue>,
    info: Arc<InfoCache>,
    retry: RetryPolicy,
    enqueued: AtomicU64,
}

impl AttachmentFilter {
    pub fn new(
        category: ContentCategory,
        client: Arc<dyn ChatClient>,
        resolver: Arc<ConfigResolver>,
        actions: Arc<dyn ActionQueue>,
        dispatch: Arc<DispatchQueue>,
        info: Arc<InfoCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: format!("{category}_filter"),
            category,
            client,
            resolver,
            actions,
            dispatch,
            info,
            retry,
            enqueued: AtomicU64::new(0),
        }
    }

    async fn process_room_events(&self, room_id: &str, events: &[RoomEvent]) -> Result<()> {
        let results = join_all(
            events
                .iter()
                .map(|event| self.process_event(room_id, event)),
        )
        .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err().map(|e| format!("{e:#}")))
            .collect();
        if !failures.is_empty() {
            bail!(
                "{} event(s) failed in room {room_id}: {}",
                failures.len(),
                failures.join("; ")
            );
        }
        Ok(())
    }

    async fn process_event(&self, room_id: &str, event: &RoomEvent) -> Result<()> {
        if !event.is_message() || event.msgtype() != self.category.msgtype() {
            return Ok(());
        }

        let config = self
            .resolver
            .get_effective(room_id)
            .with_context(|| format!("resolving configuration for room {room_id}"))?;

        if config.section(self.category).allowed {
            return Ok(());
        }
        if config.is_exempt(self.category, &event.sender) {
            debug!(sender = %event.sender, "sender exempt, leaving event alone");
            return Ok(());
        }

        let attempt = self.redaction_attempt(room_id, event);
        let action = Action::new(&event.event_id, attempt).with_retry(self.retry.clone());
        if self.actions.enqueue(action).await {
            self.enqueued.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Build the per-attempt work future: redact, then audit the removal.
    /// Only the redaction can fail; audit text is best-effort.
    fn redaction_attempt(
        &self,
        room_id: &str,
        event: &RoomEvent,
    ) -> impl FnMut() -> ActionFuture + Send + 'static {
        let client = Arc::clone(&self.client);
        let info = Arc::clone(&self.info);
        let dispatch = Arc::clone(&self.dispatch);
        let resolver = Arc::clone(&self.resolver);
        let category = self.category;
        let room_id = room_id.to_owned();
        let event_id = event.event_id.clone();
        let sender = event.sender.clone();
        let content = event.content.clone();

        move || {
            let client = Arc::clone(&client);
            let info = Arc::clone(&info);
            let dispatch = Arc::clone(&dispatch);
            let resolver = Arc::clone(&resolver);
            let room_id = room_id.clone();
            let event_id = event_id.clone();
            let sender = sender.clone();
            let content = content.clone();

            Box::pin(async move {
                debug!(event_id = %event_id, "redacting {category} message");
                client
                    .redact_event(
                        &room_id,
                        &event_id,
                        &format!("Not allowed to send {category} messages in this room"),
                    )
                    .await
                    .with_context(|| format!("redacting {event_id} in {room_id}"))?;

                let display_name = info.display_name(&room_id, &sender).await;
                let room_name = info.room_name(&room_id).await;
                if let Some(log_room) = resolver.log_room_id() {
                    let detail =
                        serde_json::to_string_pretty(&content).unwrap_or_else(|_| String::new());
                    dispatch.enqueue(
                        log_room,
                        Notice::plain(format!(
                            "{category} sent by {display_name} ({sender}) in {room_name} ({room_id}) was removed"
                        ))
                        .with_section("Message data", &detail),
                    );
                }
                Ok(())
            }) as ActionFuture
        }
    }
}

#[async_trait]
impl ContentFilter for AttachmentFilter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, batch), fields(filter = %self.name, room_id = %batch.room_id))]
    async fn process_batch(&self, batch: &TimelineBatch) -> Result<()> {
        self.process_room_events(&batch.room_id, &batch.events).await
    }

    async fn process_event_list(&self, events: &[RoomEvent]) -> Result<()> {
        let mut by_room: HashMap<&str, Vec<RoomEvent>> = HashMap::new();
        for event in events {
            if let Some(room_id) = event.room_id.as_deref() {
                by_room.entry(room_id).or_default().push(event.clone());
            }
        }

        let results = join_all(
            by_room
                .iter()
                .map(|(room_id, events)| self.process_room_events(room_id, events)),
        )
        .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    fn action_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }
}
