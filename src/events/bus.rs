//! Broadcast channel that tells assembled views they are stale
//!
//! Each manager mutation lands here as one [`CrudEvent`]. A receiver that falls
//! more than `capacity` events behind gets `RecvError::Lagged` and should
//! re-assemble from scratch rather than replay.

use super::{CrudEvent, EventEmitter};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default broadcast channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process [`EventEmitter`] over `tokio::sync::broadcast`.
///
/// Clones share one channel. Emitting with no receiver drops the event.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrudEvent>,
    capacity: usize,
}

impl EventBus {
    /// A zero capacity is raised to 1, the smallest channel tokio accepts
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrudEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events a receiver may fall behind before it lags
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: CrudEvent) {
        let kind = event.entity_type;
        let action = event.action.clone();
        match self.sender.send(event) {
            Ok(receivers) => debug!(%kind, ?action, receivers, "Views invalidated"),
            Err(broadcast::error::SendError(event)) => {
                trace!(%kind, entity_id = %event.entity_id, "No view subscribed, event dropped")
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
