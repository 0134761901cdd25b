//! Outbound audit/notice dispatch.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::domain::models::{DispatchMessage, Notice};
use crate::domain::ports::ChatClient;
use crate::services::worker::Shutdown;

/// Unbounded FIFO queue of outbound notices.
///
/// Messages have no identity and are never deduplicated. A background loop
/// wakes on a fixed tick and sends everything queued under its own permit
/// count. Producers are never blocked; depth past the warning threshold is
/// a signal to operators, not enforcement.
pub struct DispatchQueue {
    client: Arc<dyn ChatClient>,
    queue: Mutex<VecDeque<DispatchMessage>>,
    permits: Arc<Semaphore>,
    tick: Duration,
    warn_depth: usize,
}

impl DispatchQueue {
    pub fn new(
        client: Arc<dyn ChatClient>,
        permits: usize,
        tick: Duration,
        warn_depth: usize,
    ) -> Self {
        Self {
            client,
            queue: Mutex::new(VecDeque::new()),
            permits: Arc::new(Semaphore::new(permits)),
            tick,
            warn_depth,
        }
    }

    pub fn enqueue(&self, room_id: impl Into<String>, content: Notice) {
        let depth = {
            let mut queue = self.queue.lock().expect("dispatch queue poisoned");
            queue.push_back(DispatchMessage {
                room_id: room_id.into(),
                content,
            });
            queue.len()
        };

        if depth > self.warn_depth {
            warn!(
                depth,
                "message queue is getting full, consider raising the concurrency limit or exempting the agent"
            );
        }
    }

    pub fn depth(&self) -> usize {
        self.queue.lock().expect("dispatch queue poisoned").len()
    }

    fn pop(&self) -> Option<DispatchMessage> {
        self.queue.lock().expect("dispatch queue poisoned").pop_front()
    }

    /// Send everything queued, in submission order, one permit each.
    async fn drain(&self) {
        while let Some(message) = self.pop() {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let client = Arc::clone(&self.client);
            tokio::spawn(async move {
                if let Err(err) = client.send_notice(&message.room_id, &message.content).await {
                    warn!(room_id = %message.room_id, "failed to send notice: {err}");
                }
                drop(permit);
            });
        }
    }

    pub async fn run(self: Arc<Self>, shutdown: Shutdown) {
        info!("dispatch queue started");
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            self.drain().await;
            if shutdown.is_requested() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {}
                () = shutdown.requested() => {}
            }
        }

        // flush the backlog before exiting
        self.drain().await;
        info!("dispatch queue stopped");
    }
}
