//! In-memory Wi-Fi platform
//!
//! Simulates nearby networks, the association state and the trust store.
//! Failures and association outcomes can be injected, and every
//! state-changing call is recorded so callers can assert on it.

use async_trait::async_trait;
use dashmap::DashMap;
use magic_protocol::{
    Credential, NetworkRecord, RadioInterface, SsidFilter, TrustAnchor, TrustConfiguration,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{Notify, broadcast};
use tracing::debug;

use crate::event::PlatformEvent;
use crate::{PlatformError, WifiPlatform};

const EVENT_CAPACITY: usize = 64;

/// What `associate` does on the next calls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssociateBehavior {
    /// Join the requested SSID
    #[default]
    Join,
    /// Join, but report that the radio was already associated
    AlreadyAssociated,
    /// Return an error and stay put
    Fail(String),
    /// Report success without changing the association
    Stay,
    /// Report success but end up on another SSID
    JoinOther(String),
}

/// State-changing calls, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Scan,
    Install(String),
    Authorize(String),
    Remove(String),
    Associate(String),
    Disassociate(String),
}

impl PlatformCall {
    pub fn is_install(&self) -> bool {
        matches!(self, PlatformCall::Install(_))
    }

    pub fn is_authorize(&self) -> bool {
        matches!(self, PlatformCall::Authorize(_))
    }

    pub fn is_associate(&self) -> bool {
        matches!(self, PlatformCall::Associate(_))
    }
}

pub struct MemoryPlatform {
    nearby: RwLock<Vec<NetworkRecord>>,
    current_ssid: Mutex<Option<String>>,
    interfaces: RwLock<Vec<RadioInterface>>,
    installed: DashMap<String, TrustConfiguration>,
    scan_error: Mutex<Option<String>>,
    install_error: Mutex<Option<String>>,
    authorize_error: Mutex<Option<String>>,
    associate_behavior: Mutex<AssociateBehavior>,
    associate_gate: Mutex<Option<Arc<Notify>>>,
    associate_started: Notify,
    last_credential: Mutex<Option<Credential>>,
    calls: Mutex<Vec<PlatformCall>>,
    events: broadcast::Sender<PlatformEvent>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            nearby: RwLock::new(Vec::new()),
            current_ssid: Mutex::new(None),
            interfaces: RwLock::new(vec![RadioInterface::new("wlan0")]),
            installed: DashMap::new(),
            scan_error: Mutex::new(None),
            install_error: Mutex::new(None),
            authorize_error: Mutex::new(None),
            associate_behavior: Mutex::new(AssociateBehavior::default()),
            associate_gate: Mutex::new(None),
            associate_started: Notify::new(),
            last_credential: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn with_networks(self, networks: Vec<NetworkRecord>) -> Self {
        *self.nearby.write() = networks;
        self
    }

    pub fn with_current_ssid(self, ssid: impl Into<String>) -> Self {
        *self.current_ssid.lock() = Some(ssid.into());
        self
    }

    pub fn with_interfaces(self, interfaces: Vec<RadioInterface>) -> Self {
        *self.interfaces.write() = interfaces;
        self
    }

    pub fn set_networks(&self, networks: Vec<NetworkRecord>) {
        *self.nearby.write() = networks;
    }

    /// Change the association without raising an event
    pub fn set_current_ssid(&self, ssid: Option<&str>) {
        *self.current_ssid.lock() = ssid.map(str::to_string);
    }

    pub fn fail_scan(&self, reason: Option<&str>) {
        *self.scan_error.lock() = reason.map(str::to_string);
    }

    pub fn fail_install(&self, reason: Option<&str>) {
        *self.install_error.lock() = reason.map(str::to_string);
    }

    pub fn fail_authorize(&self, reason: Option<&str>) {
        *self.authorize_error.lock() = reason.map(str::to_string);
    }

    pub fn set_associate_behavior(&self, behavior: AssociateBehavior) {
        *self.associate_behavior.lock() = behavior;
    }

    /// Make `associate` block until [`MemoryPlatform::release_association`]
    pub fn hold_associations(&self) {
        *self.associate_gate.lock() = Some(Arc::new(Notify::new()));
    }

    /// Let one held `associate` call finish
    pub fn release_association(&self) {
        if let Some(gate) = self.associate_gate.lock().as_ref() {
            gate.notify_one();
        }
    }

    /// Wait until an `associate` call has started
    pub async fn association_started(&self) {
        self.associate_started.notified().await;
    }

    /// Place a configuration directly into the trust store
    pub fn preinstall(&self, config: TrustConfiguration) {
        self.installed.insert(config.ssid.clone(), config);
    }

    pub fn installed_configuration(&self, ssid: &str) -> Option<TrustConfiguration> {
        self.installed.get(ssid).map(|entry| entry.value().clone())
    }

    pub fn installed_ssids(&self) -> Vec<String> {
        let mut ssids: Vec<String> = self.installed.iter().map(|e| e.key().clone()).collect();
        ssids.sort();
        ssids
    }

    /// Credential passed to the most recent `associate`
    pub fn last_credential(&self) -> Option<Credential> {
        self.last_credential.lock().clone()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&PlatformCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Raise a platform event to all subscribers
    pub fn emit_event(&self, event: PlatformEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, call: PlatformCall) {
        debug!("platform call: {:?}", call);
        self.calls.lock().push(call);
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WifiPlatform for MemoryPlatform {
    async fn scan(&self, filter: &SsidFilter) -> Result<Vec<NetworkRecord>, PlatformError> {
        self.record(PlatformCall::Scan);
        if let Some(reason) = self.scan_error.lock().clone() {
            return Err(PlatformError::Unavailable(reason));
        }
        Ok(self
            .nearby
            .read()
            .iter()
            .filter(|record| filter.matches(&record.ssid))
            .cloned()
            .collect())
    }

    async fn current_ssid(&self) -> Option<String> {
        self.current_ssid.lock().clone()
    }

    fn interfaces(&self) -> Vec<RadioInterface> {
        self.interfaces.read().clone()
    }

    fn current_interface(&self) -> Option<RadioInterface> {
        self.interfaces
            .read()
            .iter()
            .find(|interface| interface.powered)
            .cloned()
    }

    async fn is_trust_configuration_installed(&self, ssid: &str) -> bool {
        self.installed.contains_key(ssid)
    }

    async fn install_trust_configuration(
        &self,
        config: &TrustConfiguration,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Install(config.ssid.clone()));
        if let Some(reason) = self.install_error.lock().clone() {
            return Err(PlatformError::Failed(reason));
        }
        self.installed.insert(config.ssid.clone(), config.clone());
        Ok(())
    }

    async fn authorize_configuration(
        &self,
        config: &TrustConfiguration,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Authorize(config.ssid.clone()));
        if let Some(reason) = self.authorize_error.lock().clone() {
            return Err(PlatformError::Denied(reason));
        }
        Ok(())
    }

    async fn remove_trust_configuration(&self, ssid: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::Remove(ssid.to_string()));
        self.installed.remove(ssid);
        Ok(())
    }

    async fn associate(
        &self,
        ssid: &str,
        credential: &Credential,
        _anchor: &TrustAnchor,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Associate(ssid.to_string()));
        *self.last_credential.lock() = Some(credential.clone());
        self.associate_started.notify_one();

        let gate = self.associate_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let behavior = self.associate_behavior.lock().clone();
        match behavior {
            AssociateBehavior::Join => {
                *self.current_ssid.lock() = Some(ssid.to_string());
                Ok(())
            }
            AssociateBehavior::AlreadyAssociated => {
                *self.current_ssid.lock() = Some(ssid.to_string());
                Err(PlatformError::AlreadyAssociated)
            }
            AssociateBehavior::Fail(reason) => Err(PlatformError::Failed(reason)),
            AssociateBehavior::Stay => Ok(()),
            AssociateBehavior::JoinOther(other) => {
                *self.current_ssid.lock() = Some(other);
                Ok(())
            }
        }
    }

    fn disassociate(&self, ssid: &str) {
        self.record(PlatformCall::Disassociate(ssid.to_string()));
        let mut current = self.current_ssid.lock();
        if current.as_deref() == Some(ssid) {
            *current = None;
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }
}
