//! Recent-action-id tracker backing duplicate suppression.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Tracks which action ids are in flight or recently seen.
///
/// Internally synchronized: many producers may insert while drain loops
/// release, with no external locking. An optional retention bound evicts
/// the oldest ids; unbounded retention reproduces the historical behaviour
/// where an id, once seen, is suppressed for the process lifetime.
pub struct RecencyTracker {
    inner: Mutex<TrackerInner>,
}

struct TrackerInner {
    seen: HashSet<String>,
    order: VecDeque<String>,
    retention: Option<usize>,
}

impl RecencyTracker {
    pub fn unbounded() -> Self {
        Self::with_retention(None)
    }

    pub fn with_retention(retention: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                seen: HashSet::new(),
                order: VecDeque::new(),
                retention,
            }),
        }
    }

    /// Record `id` as recent. Returns `false` (and records nothing) when
    /// the id is already tracked.
    pub fn try_insert(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().expect("recency tracker poisoned");
        if inner.seen.contains(id) {
            return false;
        }

        inner.seen.insert(id.to_owned());
        inner.order.push_back(id.to_owned());

        if let Some(cap) = inner.retention {
            while inner.order.len() > cap {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.seen.remove(&oldest);
                }
            }
        }

        true
    }

    /// Forget an id, re-admitting future submissions with the same id.
    pub fn release(&self, id: &str) {
        let mut inner = self.inner.lock().expect("recency tracker poisoned");
        if inner.seen.remove(id) {
            inner.order.retain(|tracked| tracked != id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .lock()
            .expect("recency tracker poisoned")
            .seen
            .contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("recency tracker poisoned").seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
