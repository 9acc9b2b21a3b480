//! Observer event bus
//!
//! Race events fan out over a tokio broadcast channel. Async observers
//! `recv().await`; synchronous ones use `blocking_recv` or `try_recv`.
//! Publishing never blocks the race worker: a slow observer lags and skips
//! events instead of stalling lap timing.

use tokio::sync::broadcast;

use slotrace_core::RaceEvent;

/// Default number of buffered events per observer
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Receiver half handed to observers
pub type EventReceiver = broadcast::Receiver<RaceEvent>;

/// Publisher of race events
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<RaceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Publish to every current observer; no observers is not an error
    pub fn publish(&self, event: RaceEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
