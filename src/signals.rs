//! Global signal bus. Decouples the tour from what opens it and from the
//! widgets and screens its steps hand off to.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// Something elsewhere asked for the tour.
    OpenGuidedTour,
    /// The tour handed off to the concierge contact widget.
    OpenConcierge,
    /// Go to another screen.
    Navigate { path: String },
}

/// Broadcast publish/subscribe bus.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    /// Publish a signal. No-op when nobody is listening.
    pub fn publish(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            debug!("Signal published with no subscribers");
        }
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
