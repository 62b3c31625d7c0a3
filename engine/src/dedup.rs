//! Bounded window of recently seen delivery ids.
//!
//! Push transports may deliver at-least-once; dropping already-seen event
//! ids before they reach the store makes application effectively
//! exactly-once.

use crate::EventId;
use std::collections::{HashSet, VecDeque};

/// Default window capacity.
pub const DEFAULT_DEDUP_CAP: usize = 200;

/// FIFO window of recently seen delivery ids.
#[derive(Debug, Clone)]
pub struct DeliveryWindow {
    order: VecDeque<EventId>,
    seen: HashSet<EventId>,
    cap: usize,
}

impl Default for DeliveryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAP)
    }
}

impl DeliveryWindow {
    /// Create a window with the given capacity (minimum 1).
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            order: VecDeque::with_capacity(cap),
            seen: HashSet::with_capacity(cap),
            cap,
        }
    }

    /// Record a delivery id. Returns `false` when the id was already in
    /// the window and the delivery should be dropped.
    pub fn observe(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
