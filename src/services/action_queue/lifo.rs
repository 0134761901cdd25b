//! Freshest-first action queue.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::domain::models::Action;
use crate::services::recency::RecencyTracker;
use crate::services::worker::{Shutdown, WakeTimer};

use super::ActionQueue;

/// LIFO policy: the most recently submitted pending action starts first,
/// which favors fresh content when the backlog grows. An id is released
/// from the recency tracker once its work finishes cleanly, so the same
/// conceptual action may be resubmitted later; a failed action stays
/// tracked and suppressed.
pub struct LifoActionQueue {
    pending: Mutex<Vec<Action>>,
    recency: Arc<RecencyTracker>,
    permits: Arc<Semaphore>,
    wake: WakeTimer,
}

impl LifoActionQueue {
    pub fn new(recency: Arc<RecencyTracker>, permits: usize, wake_interval: Duration) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            recency,
            permits: Arc::new(Semaphore::new(permits)),
            wake: WakeTimer::new(wake_interval),
        }
    }

    fn pop(&self) -> Option<Action> {
        self.pending.lock().expect("queue poisoned").pop()
    }

    /// Start everything currently pending, newest first, one permit each.
    async fn drain(&self) {
        while let Some(action) = self.pop() {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let recency = Arc::clone(&self.recency);
            tokio::spawn(async move {
                let id = action.id().to_owned();
                match action.execute().await {
                    Ok(()) => recency.release(&id),
                    Err(err) => warn!(action_id = %id, "action failed: {err:#}"),
                }
                drop(permit);
            });
        }
    }
}

#[async_trait]
impl ActionQueue for LifoActionQueue {
    async fn enqueue(&self, action: Action) -> bool {
        if !self.recency.try_insert(action.id()) {
            warn!(action_id = %action.id(), "duplicate action id, ignoring action");
            return false;
        }

        self.pending.lock().expect("queue poisoned").push(action);
        self.wake.signal();
        true
    }

    async fn run(self: Arc<Self>, shutdown: Shutdown) {
        info!("lifo action queue started");
        loop {
            self.drain().await;
            if shutdown.is_requested() {
                break;
            }
            tokio::select! {
                () = self.wake.wait() => {}
                () = shutdown.requested() => {}
            }
        }

        self.drain().await;
        info!("lifo action queue stopped");
    }

    fn pending(&self) -> usize {
        self.pending.lock().expect("queue poisoned").len()
    }
}
