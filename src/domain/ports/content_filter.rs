//! Content filter port.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{RoomEvent, TimelineBatch};

/// A content filter inspects delivered events and enqueues corrective work.
///
/// Filters run concurrently and must not assume exclusive access to shared
/// state; anything they mutate goes through the internally synchronized
/// services (action queue, dispatch queue, config resolver).
///
/// An `Err` from either method is isolated by the fan-out engine: it is
/// logged and audited, and the remaining filters still run.
#[async_trait]
pub trait ContentFilter: Send + Sync {
    /// Stable name used in logs and audit notices.
    fn name(&self) -> &str;

    /// Inspect one reconciled timeline batch (live sync path).
    async fn process_batch(&self, batch: &TimelineBatch) -> Result<()>;

    /// Inspect an arbitrary historical event list (re-scan path). Events
    /// carry their own room ids.
    async fn process_event_list(&self, events: &[RoomEvent]) -> Result<()>;

    /// Corrective actions enqueued so far, for cycle statistics.
    fn action_count(&self) -> u64;
}
