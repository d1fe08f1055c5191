//! Connection state machine
//!
//! `ConnectionManager` is the single writer of the connection status and
//! the last-active magic network. Each `connect` ends in exactly one
//! terminal emission. A `disconnect` supersedes every attempt that started
//! before it: such an attempt stops at its next step and re-emits the live
//! status instead of its own outcome.

use magic_platform::{Notification, PlatformError, PlatformEvent, Reachability};
use magic_protocol::{ConnectionStatus, NetworkError, TrustConfiguration};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::MagicContext;
use crate::credentials::unix_now;

#[derive(Debug, Default)]
struct ConnectionState {
    status: ConnectionStatus,
    last_active: Option<String>,
    generation: u64,
    /// Installed this run but never committed
    unauthorized: HashSet<String>,
}

/// Result of trying to apply an attempt's status
enum Settled {
    Applied(ConnectionStatus),
    Superseded(ConnectionStatus),
}

impl Settled {
    fn status(&self) -> ConnectionStatus {
        match self {
            Settled::Applied(status) | Settled::Superseded(status) => *status,
        }
    }
}

pub struct ConnectionManager {
    ctx: MagicContext,
    state: Mutex<ConnectionState>,
    in_flight: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(ctx: MagicContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(ConnectionState::default()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn context(&self) -> &MagicContext {
        &self.ctx
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    pub fn last_active_network(&self) -> Option<String> {
        self.state.lock().last_active.clone()
    }

    /// Join `ssid`, resolving to the terminal status emitted for this call.
    ///
    /// The call is ordered against `disconnect` when it is made, not when
    /// the returned future is first polled.
    pub fn connect<'a>(
        &'a self,
        ssid: &'a str,
    ) -> impl Future<Output = ConnectionStatus> + Send + 'a {
        let generation = self.state.lock().generation;
        self.attempt(ssid.to_string(), generation)
    }

    /// Run `connect` on the runtime, off the caller's context
    pub fn spawn_connect(self: &Arc<Self>, ssid: String) -> JoinHandle<ConnectionStatus> {
        let generation = self.state.lock().generation;
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.attempt(ssid, generation).await })
    }

    async fn attempt(&self, ssid: String, generation: u64) -> ConnectionStatus {
        let _flight = self.in_flight.lock().await;
        let ctx = &self.ctx;

        if ctx.directory.current_ssid().await.as_deref() == Some(ssid.as_str()) {
            debug!("Already associated to {}", ssid);
            return self
                .settle(generation, ConnectionStatus::Connected, Some(ssid.as_str()))
                .status();
        }

        if !ctx.signer.is_valid() {
            warn!("Cannot connect to {}: identity is missing or invalid", ssid);
            return self.fail(generation, &ssid, NetworkError::InvalidAccount);
        }

        if let Some(live) = self.advance(generation, ConnectionStatus::Pending) {
            return live;
        }
        info!("Connecting to {}", ssid);

        let credential = match ctx.deriver.derive(unix_now()) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Credential derivation failed: {}", e);
                return self.fail(generation, &ssid, NetworkError::PasswordGenerationFailed);
            }
        };

        let config = TrustConfiguration::new(&ssid, &credential, &ctx.anchor);
        if ctx.platform.is_trust_configuration_installed(&ssid).await {
            debug!("Trust configuration for {} already installed", ssid);
        } else {
            if let Some(live) = self.checkpoint(generation) {
                return live;
            }
            if let Err(e) = ctx.platform.install_trust_configuration(&config).await {
                warn!("Installing trust configuration for {} failed: {}", ssid, e);
                return self.fail(generation, &ssid, NetworkError::ConfigInstallFailed);
            }
            self.state.lock().unauthorized.insert(ssid.clone());
            debug!(
                "Installed trust configuration {} (anchor {})",
                config.display_name,
                config.anchor.fingerprint()
            );
        }

        // Consent is only asked for a configuration this client installed
        let needs_authorization = self.state.lock().unauthorized.contains(&ssid);
        if needs_authorization {
            if let Some(live) = self.checkpoint(generation) {
                return live;
            }
            if let Err(e) = ctx.platform.authorize_configuration(&config).await {
                warn!("Trust configuration for {} not authorized: {}", ssid, e);
                return self.fail(generation, &ssid, NetworkError::ConfigAuthorizationFailed);
            }
            self.state.lock().unauthorized.remove(&ssid);
        }

        if let Some(live) = self.checkpoint(generation) {
            return live;
        }

        if let Some(live) = self.checkpoint(generation) {
            return live;
        }
        let joined = match ctx.platform.associate(&ssid, &credential, &ctx.anchor).await {
            Ok(()) => {
                let live = ctx.directory.current_ssid().await;
                if live.as_deref() == Some(ssid.as_str()) {
                    true
                } else {
                    warn!(
                        "Association to {} reported success but radio is on {:?}",
                        ssid, live
                    );
                    false
                }
            }
            Err(PlatformError::AlreadyAssociated) => {
                debug!("Association to {} raced an existing join", ssid);
                true
            }
            Err(e) => {
                warn!("Association to {} failed: {}", ssid, e);
                false
            }
        };

        if !joined {
            return self.fail(generation, &ssid, NetworkError::NetworkConnectionFailed);
        }

        match self.settle(generation, ConnectionStatus::Connected, Some(ssid.as_str())) {
            Settled::Applied(status) => {
                info!("Connected to {}", ssid);
                if ctx.notifications.connect {
                    ctx.notifier.notify(&Notification::connected(&ssid));
                }
                status
            }
            Settled::Superseded(live) => {
                info!("Connection to {} was superseded, leaving", ssid);
                ctx.platform.disassociate(&ssid);
                live
            }
        }
    }

    /// Leave the magic network, if any, and settle on `Disconnected`
    pub async fn disconnect(&self) -> ConnectionStatus {
        let live = self
            .ctx
            .directory
            .current_ssid()
            .await
            .filter(|ssid| self.ctx.directory.is_magic(ssid));

        let previous = {
            let mut state = self.state.lock();
            state.generation += 1;
            let previous = state.last_active.take();
            self.publish(&mut state, ConnectionStatus::Disconnected);
            previous
        };

        let mut targets: Vec<String> = previous.into_iter().collect();
        if let Some(live) = live {
            if !targets.contains(&live) {
                targets.push(live);
            }
        }

        if targets.is_empty() {
            debug!("Disconnect: no magic network to leave");
            return ConnectionStatus::Disconnected;
        }

        for ssid in &targets {
            info!("Leaving {}", ssid);
            self.ctx.platform.disassociate(ssid);
            self.forget(ssid).await;
        }
        if self.ctx.notifications.disconnect {
            self.ctx
                .notifier
                .notify(&Notification::disconnected(targets.first().map(String::as_str)));
        }
        ConnectionStatus::Disconnected
    }

    /// Probe the live association, then run the first scan
    pub async fn initialize(&self) {
        if let Some(ssid) = self.ctx.directory.current_ssid().await {
            if self.ctx.directory.is_magic(&ssid) {
                info!("Already on magic network {}", ssid);
                let mut state = self.state.lock();
                state.last_active = Some(ssid);
                self.publish(&mut state, ConnectionStatus::Connected);
            }
        }

        if let Err(e) = self.scan().await {
            warn!("Initial scan failed: {}", e);
        }
    }

    /// Refresh the directory and announce `ScanCompleted`.
    ///
    /// The announcement does not replace the live status.
    pub async fn scan(&self) -> Result<usize, NetworkError> {
        let records = self.ctx.directory.scan().await?;
        let _state = self.state.lock();
        self.ctx.events.emit(ConnectionStatus::ScanCompleted);
        Ok(records.len())
    }

    /// Connect to the strongest candidate unless busy or already on one
    pub async fn join_best_candidate(&self) -> Option<ConnectionStatus> {
        if self.status() == ConnectionStatus::Pending {
            return None;
        }
        if let Some(live) = self.ctx.directory.current_ssid().await {
            if self.ctx.directory.is_magic(&live) {
                return None;
            }
        }

        let candidate = self.ctx.directory.best_candidate()?;
        info!(
            "Auto-joining {} ({}% signal)",
            candidate.ssid,
            candidate.quality()
        );
        Some(self.connect(&candidate.ssid).await)
    }

    pub async fn handle_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::LinkChanged(reachability) => self.on_link_changed(reachability).await,
            PlatformEvent::SsidChanged(ssid) => self.on_ssid_changed(ssid.as_deref()),
            PlatformEvent::ScanCacheUpdated => {
                if let Err(e) = self.scan().await {
                    debug!("Rescan after cache update failed: {}", e);
                }
            }
        }
    }

    /// Feed platform events into [`ConnectionManager::handle_event`]
    pub fn spawn_event_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.ctx.platform.subscribe();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => manager.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} platform events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Platform event stream closed");
                        break;
                    }
                }
            }
        })
    }

    async fn on_link_changed(&self, reachability: Reachability) {
        let live = self.ctx.directory.current_ssid().await;

        if !reachability.is_preferred() {
            // Switching networks reports a transient loss while still associated
            if live.is_none() {
                self.implicit_disconnect().await;
            }
            return;
        }

        match live {
            Some(ssid) if self.ctx.directory.is_magic(&ssid) => {
                let stale = {
                    let mut state = self.state.lock();
                    let moved = state
                        .last_active
                        .as_deref()
                        .is_some_and(|previous| previous != ssid);
                    if moved {
                        state.last_active.replace(ssid.clone())
                    } else {
                        None
                    }
                };
                if let Some(stale) = stale {
                    info!("Moved from {} to {}", stale, ssid);
                    self.forget(&stale).await;
                }
            }
            _ => self.implicit_disconnect().await,
        }
    }

    /// A missing SSID is left to the reachability path
    fn on_ssid_changed(&self, ssid: Option<&str>) {
        let Some(ssid) = ssid else {
            debug!("SSID cleared");
            return;
        };
        if self.ctx.directory.is_magic(ssid) {
            return;
        }
        let mut state = self.state.lock();
        if state.status == ConnectionStatus::Connected {
            info!("Left magic network for {}", ssid);
            self.publish(&mut state, ConnectionStatus::Disconnected);
        }
    }

    /// Forget the last-active network without deassociating
    async fn implicit_disconnect(&self) {
        let previous = {
            let mut state = self.state.lock();
            let Some(previous) = state.last_active.take() else {
                return;
            };
            self.publish(&mut state, ConnectionStatus::Disconnected);
            previous
        };

        info!("Lost link to {}", previous);
        self.forget(&previous).await;
        if self.ctx.notifications.disconnect {
            self.ctx
                .notifier
                .notify(&Notification::disconnected(Some(&previous)));
        }
    }

    async fn forget(&self, ssid: &str) {
        self.state.lock().unauthorized.remove(ssid);
        if let Err(e) = self.ctx.platform.remove_trust_configuration(ssid).await {
            warn!("Removing trust configuration for {} failed: {}", ssid, e);
        }
    }

    fn publish(&self, state: &mut ConnectionState, status: ConnectionStatus) {
        state.status = status;
        self.ctx.events.emit(status);
    }

    /// Move to a non-terminal status; `Some(live)` when superseded
    fn advance(&self, generation: u64, status: ConnectionStatus) -> Option<ConnectionStatus> {
        let mut state = self.state.lock();
        if state.generation != generation {
            let live = state.status;
            self.ctx.events.emit(live);
            return Some(live);
        }
        self.publish(&mut state, status);
        None
    }

    /// `Some(live)` after emitting it, when a disconnect superseded this attempt
    fn checkpoint(&self, generation: u64) -> Option<ConnectionStatus> {
        let state = self.state.lock();
        if state.generation == generation {
            return None;
        }
        debug!("Connect attempt superseded");
        self.ctx.events.emit(state.status);
        Some(state.status)
    }

    fn settle(&self, generation: u64, status: ConnectionStatus, active: Option<&str>) -> Settled {
        let mut state = self.state.lock();
        if state.generation != generation {
            let live = state.status;
            self.ctx.events.emit(live);
            return Settled::Superseded(live);
        }
        if let Some(ssid) = active {
            state.last_active = Some(ssid.to_string());
        }
        self.publish(&mut state, status);
        Settled::Applied(status)
    }

    fn fail(&self, generation: u64, ssid: &str, reason: NetworkError) -> ConnectionStatus {
        match self.settle(generation, ConnectionStatus::Error(reason), None) {
            Settled::Applied(status) => {
                if self.ctx.notifications.failure {
                    self.ctx
                        .notifier
                        .notify(&Notification::connect_failed(ssid, reason));
                }
                status
            }
            Settled::Superseded(live) => live,
        }
    }
}
