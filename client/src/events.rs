//! Status delivery to observers

use magic_protocol::ConnectionStatus;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_CAPACITY: usize = 64;

/// Receives every status emission
pub trait EventSink: Send + Sync {
    fn emit(&self, status: ConnectionStatus);
}

pub type SharedEventSink = Arc<dyn EventSink>;

/// Broadcast bus; delivery is at-most-once and unacknowledged
pub struct StatusBus {
    tx: broadcast::Sender<ConnectionStatus>,
}

impl StatusBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for StatusBus {
    fn emit(&self, status: ConnectionStatus) {
        debug!(event = status.event_name(), "status {}", status);
        // No subscribers is not an error
        let _ = self.tx.send(status);
    }
}

/// Log every status published on `bus`
pub fn spawn_status_logger(bus: &StatusBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(status) => info!("[{}] {}", status.event_name(), status),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Status logger skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
