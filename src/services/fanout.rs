//! Concurrent filter fan-out with per-filter failure isolation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Notice, RoomEvent, TimelineBatch};
use crate::domain::ports::ContentFilter;
use crate::services::config_resolver::ConfigResolver;
use crate::services::dispatch_queue::DispatchQueue;

/// Distributes each reconciled batch (or historical event list) to every
/// registered filter concurrently.
///
/// A filter that returns an error or panics is logged and reported to the
/// log room; the other filters are unaffected. There is no ordering
/// guarantee across filters.
pub struct FilterFanout {
    filters: Vec<Arc<dyn ContentFilter>>,
    resolver: Arc<ConfigResolver>,
    dispatch: Arc<DispatchQueue>,
}

impl FilterFanout {
    /// Wiring up an engine with no filters is a configuration error, not
    /// something to discover at runtime.
    pub fn new(
        filters: Vec<Arc<dyn ContentFilter>>,
        resolver: Arc<ConfigResolver>,
        dispatch: Arc<DispatchQueue>,
    ) -> DomainResult<Self> {
        if filters.is_empty() {
            return Err(DomainError::NoFiltersRegistered);
        }
        Ok(Self {
            filters,
            resolver,
            dispatch,
        })
    }

    pub fn filters(&self) -> &[Arc<dyn ContentFilter>] {
        &self.filters
    }

    /// Total corrective actions enqueued by all filters so far.
    pub fn action_count(&self) -> u64 {
        self.filters.iter().map(|f| f.action_count()).sum()
    }

    /// Fan one reconciled batch out to every filter (live sync path).
    #[instrument(skip(self, batch), fields(room_id = %batch.room_id, events = batch.events.len()))]
    pub async fn process_batch(&self, batch: TimelineBatch) {
        if self.resolver.is_reserved_room(&batch.room_id) {
            debug!("skipping reserved room");
            return;
        }

        let batch = Arc::new(batch);
        let handles: Vec<(String, JoinHandle<anyhow::Result<()>>)> = self
            .filters
            .iter()
            .map(|filter| {
                let filter = Arc::clone(filter);
                let batch = Arc::clone(&batch);
                (
                    filter.name().to_owned(),
                    tokio::spawn(async move { filter.process_batch(&batch).await }),
                )
            })
            .collect();

        self.collect(handles).await;
    }

    /// Fan an arbitrary historical event list out to every filter
    /// (administrative re-scan path). Events from reserved rooms are
    /// removed before any filter sees the list.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub async fn process_event_list(&self, mut events: Vec<RoomEvent>) {
        events.retain(|event| {
            event
                .room_id
                .as_deref()
                .is_none_or(|room| !self.resolver.is_reserved_room(room))
        });

        let events: Arc<[RoomEvent]> = events.into();
        let handles: Vec<(String, JoinHandle<anyhow::Result<()>>)> = self
            .filters
            .iter()
            .map(|filter| {
                let filter = Arc::clone(filter);
                let events = Arc::clone(&events);
                (
                    filter.name().to_owned(),
                    tokio::spawn(async move { filter.process_event_list(&events).await }),
                )
            })
            .collect();

        self.collect(handles).await;
    }

    async fn collect(&self, handles: Vec<(String, JoinHandle<anyhow::Result<()>>)>) {
        for (name, handle) in handles {
            let failure = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(format!("{err:#}")),
                Err(join_err) if join_err.is_panic() => Some("filter panicked".to_string()),
                Err(join_err) => Some(join_err.to_string()),
            };

            if let Some(reason) = failure {
                let err = DomainError::FilterFailed {
                    filter: name,
                    reason,
                };
                error!("{err}");
                if let Some(log_room) = self.resolver.log_room_id() {
                    self.dispatch
                        .enqueue(log_room, Notice::plain(format!("Error processing events: {err}")));
                }
            }
        }
    }
}
