//! Background scanning and auto-join

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::connectivity::ConnectionManager;

/// Start the periodic scanner
pub fn start_scanner(
    manager: Arc<ConnectionManager>,
    interval: Duration,
    auto_join: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Scanner started, scanning every {:?} (auto-join {})",
            interval,
            if auto_join { "on" } else { "off" }
        );

        loop {
            tokio::time::sleep(interval).await;

            match manager.scan().await {
                Ok(found) => debug!("Periodic scan found {} networks", found),
                // logged by the directory
                Err(_) => continue,
            }

            if auto_join {
                if let Some(status) = manager.join_best_candidate().await {
                    info!("Auto-join finished: {}", status);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use magic_crypto::Identity;
    use magic_platform::{MemoryPlatform, PlatformCall};
    use magic_protocol::{ConnectionStatus, NetworkRecord, TrustAnchor};

    use crate::context::MagicContext;
    use crate::events::StatusBus;

    fn manager(platform: Arc<MemoryPlatform>) -> Arc<ConnectionManager> {
        let anchor = TrustAnchor::from_der("test", vec![0x30, 0x00]).unwrap();
        let ctx = MagicContext::new(
            platform,
            Arc::new(Identity::generate()),
            anchor,
            Arc::new(StatusBus::default()),
        );
        Arc::new(ConnectionManager::new(ctx))
    }

    #[tokio::test]
    async fn test_scanner_auto_joins() {
        let platform = Arc::new(
            MemoryPlatform::new().with_networks(vec![NetworkRecord::new("magic-lobby", -60)]),
        );
        let manager = manager(platform.clone());

        let handle = start_scanner(manager.clone(), Duration::from_millis(10), true);
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(platform.count_calls(PlatformCall::is_associate), 1);
    }

    #[tokio::test]
    async fn test_scanner_without_auto_join() {
        let platform = Arc::new(
            MemoryPlatform::new().with_networks(vec![NetworkRecord::new("magic-lobby", -60)]),
        );
        let manager = manager(platform.clone());

        let handle = start_scanner(manager.clone(), Duration::from_millis(10), false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(platform.count_calls(|c| *c == PlatformCall::Scan) >= 1);
        assert_eq!(platform.count_calls(PlatformCall::is_associate), 0);
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }
}
