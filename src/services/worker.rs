//! Shared primitives for the background worker loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;

/// Cooperative stop signal shared by all background loops.
///
/// Requesting shutdown does not interrupt in-flight work; each loop stops
/// taking new iterations, flushes its backlog once, and exits.
#[derive(Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested.
    pub async fn requested(&self) {
        loop {
            if self.is_requested() {
                return;
            }
            // register interest before re-checking, so a request landing
            // in between cannot be lost
            let notified = self.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Wait primitive combining an explicit wake-up signal with a periodic
/// safety-net timeout. Both queue policies use this one mechanism instead
/// of mixing polling and signalling.
pub struct WakeTimer {
    notify: Notify,
    period: Duration,
}

impl WakeTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            notify: Notify::new(),
            period,
        }
    }

    /// Wake the waiting loop now.
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Wait until signalled or until the safety-net period elapses.
    pub async fn wait(&self) {
        let _ = timeout(self.period, self.notify.notified()).await;
    }
}
