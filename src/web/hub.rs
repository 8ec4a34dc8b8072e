//! Fan-out of sensor events to WebSocket subscribers.

use crate::collaborators::Broadcaster;
use crate::error::Result;
use crate::sensor::{SensorEvent, SensorSnapshot};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel plus the latest folded snapshot for late joiners.
#[derive(Debug)]
pub struct EventHub {
    tx: broadcast::Sender<SensorEvent>,
    snapshot: RwLock<SensorSnapshot>,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            snapshot: RwLock::new(SensorSnapshot::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SensorEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Current folded state.
    pub fn snapshot(&self) -> SensorSnapshot {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Broadcaster for EventHub {
    fn publish(&self, event: SensorEvent) -> Result<()> {
        match self.snapshot.write() {
            Ok(mut guard) => guard.apply(&event),
            Err(poisoned) => poisoned.into_inner().apply(&event),
        }

        // No subscribers is not a failure; the snapshot still updates
        match self.tx.send(event) {
            Ok(receivers) => debug!("Broadcast event to {} subscribers", receivers),
            Err(_) => debug!("No subscribers for event"),
        }
        Ok(())
    }
}
