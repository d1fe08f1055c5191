//! Magic Platform - host Wi-Fi capabilities
//!
//! This crate provides:
//! - The `WifiPlatform` capability the connection core drives
//! - Platform connectivity events
//! - User-facing notifications
//! - An in-memory platform for simulation and tests

mod event;
mod memory;
mod notify;

pub use event::*;
pub use memory::*;
pub use notify::*;

use async_trait::async_trait;
use magic_protocol::{
    Credential, NetworkRecord, RadioInterface, SsidFilter, TrustAnchor, TrustConfiguration,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug)]
pub enum PlatformError {
    /// The radio already joined the requested network
    #[error("Already associated")]
    AlreadyAssociated,

    #[error("Denied: {0}")]
    Denied(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Platform call failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host Wi-Fi, trust store and radio capabilities
#[async_trait]
pub trait WifiPlatform: Send + Sync {
    /// Scan for nearby networks whose SSID passes `filter`
    async fn scan(&self, filter: &SsidFilter) -> Result<Vec<NetworkRecord>, PlatformError>;

    /// SSID the radio is associated with right now
    async fn current_ssid(&self) -> Option<String>;

    fn interfaces(&self) -> Vec<RadioInterface>;

    fn current_interface(&self) -> Option<RadioInterface>;

    async fn is_trust_configuration_installed(&self, ssid: &str) -> bool;

    async fn install_trust_configuration(
        &self,
        config: &TrustConfiguration,
    ) -> Result<(), PlatformError>;

    /// Commit an installed configuration; may need user consent
    async fn authorize_configuration(
        &self,
        config: &TrustConfiguration,
    ) -> Result<(), PlatformError>;

    async fn remove_trust_configuration(&self, ssid: &str) -> Result<(), PlatformError>;

    /// Join `ssid`. Long running; never call from an event delivery path.
    async fn associate(
        &self,
        ssid: &str,
        credential: &Credential,
        anchor: &TrustAnchor,
    ) -> Result<(), PlatformError>;

    /// Best-effort leave. Returns before the platform confirms.
    fn disassociate(&self, ssid: &str);

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent>;
}

pub type SharedWifiPlatform = Arc<dyn WifiPlatform>;
