//! Services the connection manager depends on

use magic_crypto::Signer;
use magic_platform::{LogNotifier, SharedNotifier, SharedWifiPlatform};
use magic_protocol::{CredentialLayout, CredentialLimits, SsidFilter, TrustAnchor};
use std::sync::Arc;

use crate::config::{MagicConfig, NotificationConfig};
use crate::credentials::CredentialDeriver;
use crate::directory::NetworkDirectory;
use crate::events::SharedEventSink;

/// Explicitly constructed dependencies of one connection manager
#[derive(Clone)]
pub struct MagicContext {
    pub platform: SharedWifiPlatform,
    pub signer: Arc<dyn Signer>,
    pub deriver: CredentialDeriver,
    pub directory: Arc<NetworkDirectory>,
    pub events: SharedEventSink,
    pub notifier: SharedNotifier,
    pub notifications: NotificationConfig,
    pub anchor: TrustAnchor,
}

impl MagicContext {
    pub fn new(
        platform: SharedWifiPlatform,
        signer: Arc<dyn Signer>,
        anchor: TrustAnchor,
        events: SharedEventSink,
    ) -> Self {
        Self {
            directory: Arc::new(NetworkDirectory::new(
                platform.clone(),
                SsidFilter::default(),
            )),
            deriver: CredentialDeriver::new(signer.clone()),
            platform,
            signer,
            events,
            notifier: Arc::new(LogNotifier),
            notifications: NotificationConfig::default(),
            anchor,
        }
    }

    /// Apply the network, credential and notification sections of `config`
    pub fn configured(self, config: &MagicConfig) -> Self {
        self.with_filter(config.network.filter())
            .with_credential_policy(config.credentials.limits(), config.credentials.layout)
            .with_notifications(config.notifications)
    }

    pub fn with_filter(mut self, filter: SsidFilter) -> Self {
        self.directory = Arc::new(NetworkDirectory::new(self.platform.clone(), filter));
        self
    }

    pub fn with_credential_policy(
        mut self,
        limits: CredentialLimits,
        layout: CredentialLayout,
    ) -> Self {
        self.deriver = CredentialDeriver::new(self.signer.clone())
            .with_limits(limits)
            .with_layout(layout);
        self
    }

    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }
}
