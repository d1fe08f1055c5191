//! Integration Test Harness
//!
//! Wires a `ConnectionManager` to an in-memory platform and a status bus
//! subscription so scenarios can assert on platform calls and emissions.
#![allow(dead_code)]

use magic_client::{ConnectionManager, MagicContext, StatusBus};
use magic_client::config::NotificationConfig;
use magic_crypto::Identity;
use magic_platform::{MemoryPlatform, Notification, Notifier};
use magic_protocol::{ConnectionStatus, NetworkRecord, TrustAnchor};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

/// Well-known test key (address 0x2c7536E3605D9C16a7a3D7b1898e529396a65c23)
pub const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub const LOBBY: &str = "magic-lobby";
pub const CAFE: &str = "magic-cafe";

/// DER bytes standing in for the server certificate
pub fn anchor() -> TrustAnchor {
    TrustAnchor::from_der("Magic Certificate", vec![0x30, 0x03, 0x02, 0x01, 0x2a]).unwrap()
}

/// Platform with two magic networks and one foreign network in range
pub fn neighborhood() -> MemoryPlatform {
    MemoryPlatform::new().with_networks(vec![
        NetworkRecord::new(LOBBY, -55),
        NetworkRecord::new(CAFE, -78),
        NetworkRecord::new("coffee-shop", -40),
    ])
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn ids(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|n| n.id.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

pub struct Harness {
    pub platform: Arc<MemoryPlatform>,
    pub identity: Arc<Identity>,
    pub manager: Arc<ConnectionManager>,
    pub notifier: Arc<RecordingNotifier>,
    statuses: Receiver<ConnectionStatus>,
}

impl Harness {
    pub fn new(platform: MemoryPlatform) -> Self {
        Self::with_identity(platform, Identity::from_private_key_hex(TEST_KEY).unwrap())
    }

    pub fn with_identity(platform: MemoryPlatform, identity: Identity) -> Self {
        let platform = Arc::new(platform);
        let identity = Arc::new(identity);
        let bus = Arc::new(StatusBus::default());
        let statuses = bus.subscribe();
        let notifier = Arc::new(RecordingNotifier::default());

        let ctx = MagicContext::new(platform.clone(), identity.clone(), anchor(), bus)
            .with_notifier(notifier.clone())
            .with_notifications(NotificationConfig {
                connect: true,
                failure: true,
                disconnect: true,
            });

        Self {
            platform,
            identity,
            manager: Arc::new(ConnectionManager::new(ctx)),
            notifier,
            statuses,
        }
    }

    /// Every status emitted so far and not yet drained
    pub fn drain(&mut self) -> Vec<ConnectionStatus> {
        let mut seen = Vec::new();
        while let Ok(status) = self.statuses.try_recv() {
            seen.push(status);
        }
        seen
    }

    /// Wait for the next emission
    pub async fn next_status(&mut self) -> ConnectionStatus {
        timeout(Duration::from_secs(5), self.statuses.recv())
            .await
            .expect("no status emitted in time")
            .expect("status bus closed")
    }
}

pub fn terminal_count(statuses: &[ConnectionStatus]) -> usize {
    statuses.iter().filter(|s| s.is_terminal()).count()
}
