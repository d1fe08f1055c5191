//! Platform event handling

mod integration_harness;

use integration_harness::*;
use magic_platform::{PlatformCall, PlatformEvent, Reachability, Transport};
use magic_protocol::ConnectionStatus;

fn is_disassociate(call: &PlatformCall) -> bool {
    matches!(call, PlatformCall::Disassociate(_))
}

#[tokio::test]
async fn test_link_loss_forgets_last_active_network() {
    let mut h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.platform.set_current_ssid(None);
    h.drain();

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::unreachable()))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Disconnected);
    assert_eq!(h.manager.last_active_network(), None);
    assert!(h.platform.installed_ssids().is_empty());
    assert_eq!(h.platform.count_calls(is_disassociate), 0);
    assert_eq!(h.drain(), vec![ConnectionStatus::Disconnected]);
}

#[tokio::test]
async fn test_transient_loss_while_associated_is_ignored() {
    let mut h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.drain();

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::unreachable()))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Connected);
    assert_eq!(h.manager.last_active_network().as_deref(), Some(LOBBY));
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_demotion_to_cellular() {
    let h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.platform.set_current_ssid(None);

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::cellular()))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Disconnected);
    assert!(h.platform.installed_configuration(LOBBY).is_none());
}

#[tokio::test]
async fn test_move_to_another_magic_network() {
    let mut h = Harness::new(neighborhood());
    h.manager.connect(CAFE).await;
    h.manager.connect(LOBBY).await;
    // the platform roamed back on its own
    h.platform.set_current_ssid(Some(CAFE));
    h.drain();

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::wifi()))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Connected);
    assert_eq!(h.manager.last_active_network().as_deref(), Some(CAFE));
    assert!(h.platform.installed_configuration(LOBBY).is_none());
    assert!(h.platform.installed_configuration(CAFE).is_some());
    assert_eq!(h.platform.count_calls(is_disassociate), 0);
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_reachable_on_foreign_network() {
    let h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.platform.set_current_ssid(Some("coffee-shop"));

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability {
            reachable: true,
            transport: Transport::Wifi,
        }))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Disconnected);
    assert_eq!(h.manager.last_active_network(), None);
    assert_eq!(h.platform.count_calls(is_disassociate), 0);
    assert!(h.notifier.ids().contains(&"magic.disconnect".to_string()));
}

#[tokio::test]
async fn test_link_events_without_magic_history() {
    let mut h = Harness::new(neighborhood().with_current_ssid("coffee-shop"));

    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::unreachable()))
        .await;
    h.manager
        .handle_event(PlatformEvent::LinkChanged(Reachability::wifi()))
        .await;

    assert_eq!(h.manager.status(), ConnectionStatus::Disconnected);
    assert!(h.platform.calls().is_empty());
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_startup_on_magic_network() {
    let mut h = Harness::new(neighborhood().with_current_ssid(CAFE));

    h.manager.initialize().await;

    assert_eq!(h.manager.status(), ConnectionStatus::Connected);
    assert_eq!(h.manager.last_active_network().as_deref(), Some(CAFE));
    assert_eq!(
        h.drain(),
        vec![ConnectionStatus::Connected, ConnectionStatus::ScanCompleted]
    );
    assert_eq!(h.platform.calls(), vec![PlatformCall::Scan]);
}

#[tokio::test]
async fn test_startup_with_failing_scan() {
    let mut h = Harness::new(neighborhood());
    h.platform.fail_scan(Some("radio off"));

    h.manager.initialize().await;

    assert_eq!(h.manager.status(), ConnectionStatus::Disconnected);
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_event_loop_delivers_platform_events() {
    let mut h = Harness::new(neighborhood());
    let event_loop = h.manager.spawn_event_loop();

    h.platform.emit_event(PlatformEvent::ScanCacheUpdated);
    assert_eq!(h.next_status().await, ConnectionStatus::ScanCompleted);
    assert_eq!(h.manager.context().directory.networks().len(), 2);

    h.manager.connect(LOBBY).await;
    h.drain();
    h.platform.set_current_ssid(None);
    h.platform.emit_event(PlatformEvent::LinkChanged(Reachability::unreachable()));
    assert_eq!(h.next_status().await, ConnectionStatus::Disconnected);

    event_loop.abort();
}

#[tokio::test]
async fn test_ssid_change_to_foreign_network() {
    let mut h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.drain();

    h.manager
        .handle_event(PlatformEvent::SsidChanged(Some("coffee-shop".into())))
        .await;

    assert_eq!(h.drain(), vec![ConnectionStatus::Disconnected]);
    assert!(h.platform.installed_configuration(LOBBY).is_some());
}

#[tokio::test]
async fn test_ssid_cleared_is_ignored() {
    let mut h = Harness::new(neighborhood());
    h.manager.connect(LOBBY).await;
    h.drain();

    h.manager.handle_event(PlatformEvent::SsidChanged(None)).await;

    assert_eq!(h.manager.status(), ConnectionStatus::Connected);
    assert_eq!(h.manager.last_active_network().as_deref(), Some(LOBBY));
    assert!(h.drain().is_empty());
}
