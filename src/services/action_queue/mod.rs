//! Corrective action scheduling.
//!
//! An action queue accepts idempotency-keyed [`Action`]s from many
//! concurrent producers, suppresses duplicate ids via the shared
//! [`RecencyTracker`], and drains pending work under a fixed number of
//! concurrency permits. Two orderings exist:
//!
//! - [`FifoActionQueue`]: strict submission order, ids never re-admitted
//! - [`LifoActionQueue`]: freshest-first, ids re-admitted on completion
//!
//! A work item's failure is the item's own problem (its retry policy ran
//! out); the queue only guarantees the permit is released.

mod fifo;
mod lifo;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use fifo::FifoActionQueue;
pub use lifo::LifoActionQueue;

use crate::domain::models::{Action, QueueConfig, QueuePolicy};
use crate::services::recency::RecencyTracker;
use crate::services::worker::Shutdown;

#[async_trait]
pub trait ActionQueue: Send + Sync {
    /// Append an action unless its id is currently tracked as recent.
    ///
    /// Returns `true` if the action was accepted, `false` on a duplicate.
    async fn enqueue(&self, action: Action) -> bool;

    /// Drive the drain loop until shutdown is requested, then flush the
    /// remaining backlog once and exit.
    async fn run(self: Arc<Self>, shutdown: Shutdown);

    /// Actions accepted but not yet started.
    fn pending(&self) -> usize;
}

/// Build the queue selected by configuration, sharing the given tracker.
pub fn build_action_queue(
    config: &QueueConfig,
    recency: Arc<RecencyTracker>,
) -> Arc<dyn ActionQueue> {
    let wake_interval = Duration::from_secs(config.wake_interval_secs);
    match config.policy {
        QueuePolicy::Fifo => Arc::new(FifoActionQueue::new(
            recency,
            config.redactions,
            wake_interval,
            config.warn_depth,
        )),
        QueuePolicy::Lifo => Arc::new(LifoActionQueue::new(
            recency,
            config.redactions,
            wake_interval,
        )),
    }
}
