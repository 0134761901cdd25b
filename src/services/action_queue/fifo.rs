//! Strict submission-order action queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::domain::models::Action;
use crate::services::recency::RecencyTracker;
use crate::services::worker::{Shutdown, WakeTimer};

use super::ActionQueue;

/// FIFO policy: actions start in submission order, and a completed id is
/// never re-admitted (the tracker keeps it unless a retention bound evicts
/// it). Suited to ids drawn from a non-recurring space such as event ids.
pub struct FifoActionQueue {
    pending: Mutex<VecDeque<Action>>,
    recency: Arc<RecencyTracker>,
    permits: Arc<Semaphore>,
    wake: WakeTimer,
    warn_depth: usize,
}

impl FifoActionQueue {
    pub fn new(
        recency: Arc<RecencyTracker>,
        permits: usize,
        wake_interval: Duration,
        warn_depth: usize,
    ) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            recency,
            permits: Arc::new(Semaphore::new(permits)),
            wake: WakeTimer::new(wake_interval),
            warn_depth,
        }
    }

    fn pop(&self) -> Option<Action> {
        self.pending.lock().expect("queue poisoned").pop_front()
    }

    /// Start everything currently pending, oldest first, one permit each.
    async fn drain(&self) {
        while let Some(action) = self.pop() {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                // semaphore closed; only happens when the runtime is torn down
                break;
            };
            tokio::spawn(async move {
                let id = action.id().to_owned();
                if let Err(err) = action.execute().await {
                    warn!(action_id = %id, "action failed: {err:#}");
                }
                drop(permit);
            });
        }
    }
}

#[async_trait]
impl ActionQueue for FifoActionQueue {
    async fn enqueue(&self, action: Action) -> bool {
        if !self.recency.try_insert(action.id()) {
            warn!(action_id = %action.id(), "duplicate action id, ignoring action");
            return false;
        }

        let depth = {
            let mut pending = self.pending.lock().expect("queue poisoned");
            pending.push_back(action);
            pending.len()
        };

        if depth > self.warn_depth {
            warn!(
                depth,
                "action queue is getting full, consider raising the concurrency limit or exempting the agent"
            );
        }

        self.wake.signal();
        true
    }

    async fn run(self: Arc<Self>, shutdown: Shutdown) {
        info!("fifo action queue started");
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

        // flush whatever arrived between the last drain and the stop signal
        self.drain().await;
        info!("fifo action queue stopped");
    }

    fn pending(&self) -> usize {
        self.pending.lock().expect("queue poisoned").len()
    }
}
