use crate::domain::clock::{SharedClock, system_clock};
use crate::domain::order::Order;
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// An immutable point-in-time snapshot of an order.
///
/// The stored state is a full structural copy taken at capture time, so
/// later mutation of the live order cannot corrupt it.
#[derive(Debug, Clone)]
pub struct OrderMemento {
    order_id: u32,
    state: Order,
    timestamp: DateTime<Utc>,
    description: String,
}

impl OrderMemento {
    fn new(state: Order, timestamp: DateTime<Utc>, description: String) -> Self {
        Self {
            order_id: state.id,
            state,
            timestamp,
            description,
        }
    }

    pub fn order_id(&self) -> u32 {
        self.order_id
    }

    /// Clones the snapshot out; the memento itself stays untouched.
    pub fn state(&self) -> Order {
        self.state.clone()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn summary(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.description)
    }
}

/// Per-order snapshot history, capped per order with FIFO eviction.
pub struct OrderCaretaker {
    histories: HashMap<u32, Vec<OrderMemento>>,
    max_per_order: usize,
    clock: SharedClock,
}

impl Default for OrderCaretaker {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderCaretaker {
    pub const DEFAULT_LIMIT: usize = 20;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            histories: HashMap::new(),
            max_per_order: limit,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Deep-copies the order's current state into a new memento. Once the
    /// per-order cap is exceeded the oldest entry is evicted.
    pub fn save_state(&mut self, order: &Order, description: Option<String>) {
        let description =
            description.unwrap_or_else(|| format!("state saved - {}", order.status));
        let memento = OrderMemento::new(order.clone(), self.clock.now(), description);
        debug!(order_id = order.id, summary = %memento.summary(), "memento saved");

        let history = self.histories.entry(order.id).or_default();
        history.push(memento);
        if history.len() > self.max_per_order {
            history.remove(0);
        }
    }

    /// Returns a deep copy of the snapshot at `index` (oldest first).
    /// The caretaker's own history is never mutated by a restore; the caller
    /// decides whether to re-save the restored state as a new entry.
    pub fn restore_state(&self, order_id: u32, index: usize) -> Result<Order> {
        self.histories
            .get(&order_id)
            .and_then(|history| history.get(index))
            .map(OrderMemento::state)
            .ok_or_else(|| {
                WorkflowError::NotFound(format!(
                    "no snapshot for order #{order_id} at index {index}"
                ))
            })
    }

    pub fn restore_last_state(&self, order_id: u32) -> Result<Order> {
        let history = self.history(order_id);
        if history.is_empty() {
            return Err(WorkflowError::NotFound(format!(
                "no snapshots for order #{order_id}"
            )));
        }
        self.restore_state(order_id, history.len() - 1)
    }

    /// Ordered history for an order, oldest first. Empty if none exists.
    pub fn history(&self, order_id: u32) -> &[OrderMemento] {
        self.histories
            .get(&order_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn history_summary(&self, order_id: u32) -> Vec<String> {
        self.history(order_id)
            .iter()
            .enumerate()
            .map(|(index, memento)| format!("version {}: {}", index + 1, memento.summary()))
            .collect()
    }

    pub fn has_history(&self, order_id: u32) -> bool {
        !self.history(order_id).is_empty()
    }

    pub fn clear_history(&mut self, order_id: u32) {
        self.histories.remove(&order_id);
    }
}
