//! Client configuration

use anyhow::Result;
use magic_platform::MemoryPlatform;
use magic_protocol::{
    CredentialLayout, CredentialLimits, DEFAULT_ANCHOR_LABEL, DEFAULT_MAX_PASSWORD_LEN,
    DEFAULT_MAX_USERNAME_LEN, DEFAULT_SSID_PREFIX, NetworkRecord, RadioInterface, SsidFilter,
    TrustAnchor, TrustError,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MagicConfig {
    /// Network discovery configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// EAP credential configuration
    #[serde(default)]
    pub credentials: CredentialConfig,

    /// Identity storage configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Server trust anchor
    #[serde(default)]
    pub trust: TrustConfig,

    /// User notification preferences
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Simulated radio environment
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl MagicConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: MagicConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if tokio::fs::try_exists(path.as_ref()).await? {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }
}

/// Network discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// SSID prefix of magic networks
    #[serde(default = "default_ssid_prefix")]
    pub ssid_prefix: String,

    /// Seconds between background scans (0 disables)
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Join the strongest magic network when idle
    #[serde(default)]
    pub auto_join: bool,
}

fn default_ssid_prefix() -> String {
    DEFAULT_SSID_PREFIX.to_string()
}

fn default_scan_interval() -> u64 {
    30
}

impl NetworkConfig {
    pub fn filter(&self) -> SsidFilter {
        SsidFilter::new(self.ssid_prefix.clone())
    }

    pub fn scan_period(&self) -> Option<Duration> {
        (self.scan_interval > 0).then(|| Duration::from_secs(self.scan_interval))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid_prefix: default_ssid_prefix(),
            scan_interval: default_scan_interval(),
            auto_join: false,
        }
    }
}

/// EAP credential configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    #[serde(default = "default_max_username_len")]
    pub max_username_len: usize,

    #[serde(default = "default_max_password_len")]
    pub max_password_len: usize,

    /// Which EAP field carries the signed password
    #[serde(default)]
    pub layout: CredentialLayout,
}

fn default_max_username_len() -> usize {
    DEFAULT_MAX_USERNAME_LEN
}

fn default_max_password_len() -> usize {
    DEFAULT_MAX_PASSWORD_LEN
}

impl CredentialConfig {
    pub fn limits(&self) -> CredentialLimits {
        CredentialLimits {
            max_username_len: self.max_username_len,
            max_password_len: self.max_password_len,
        }
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            max_username_len: default_max_username_len(),
            max_password_len: default_max_password_len(),
            layout: CredentialLayout::default(),
        }
    }
}

/// Identity storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Path of the identity file
    #[serde(default = "default_identity_path")]
    pub path: PathBuf,
}

fn default_identity_path() -> PathBuf {
    PathBuf::from("identity.json")
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            path: default_identity_path(),
        }
    }
}

/// Server trust anchor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrustConfig {
    /// Keychain label of the certificate
    #[serde(default = "default_trust_label")]
    pub label: String,

    /// Certificate file (DER or PEM)
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,

    /// Inline base64 DER certificate
    #[serde(default)]
    pub certificate_base64: Option<String>,
}

fn default_trust_label() -> String {
    DEFAULT_ANCHOR_LABEL.to_string()
}

impl TrustConfig {
    /// Load the configured trust anchor; the file takes precedence
    pub async fn load_anchor(&self) -> Result<TrustAnchor> {
        if let Some(path) = &self.certificate_path {
            let bytes = tokio::fs::read(path).await?;
            return Ok(TrustAnchor::from_file_bytes(self.label.clone(), bytes)?);
        }
        match &self.certificate_base64 {
            Some(encoded) => Ok(TrustAnchor::from_base64(self.label.clone(), encoded)?),
            None => Err(TrustError::Missing.into()),
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            label: default_trust_label(),
            certificate_path: None,
            certificate_base64: None,
        }
    }
}

/// Which connection events raise a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub connect: bool,

    #[serde(default = "default_notify_failure")]
    pub failure: bool,

    #[serde(default)]
    pub disconnect: bool,
}

fn default_notify_failure() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            connect: false,
            failure: default_notify_failure(),
            disconnect: false,
        }
    }
}

/// Radio environment of the in-memory platform
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Networks in range
    #[serde(default)]
    pub networks: Vec<NetworkRecord>,

    /// SSID associated at startup
    #[serde(default)]
    pub current_ssid: Option<String>,

    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<RadioInterface>,
}

fn default_interfaces() -> Vec<RadioInterface> {
    vec![RadioInterface::new("wlan0")]
}

impl SimulationConfig {
    pub fn build_platform(&self) -> MemoryPlatform {
        let platform = MemoryPlatform::new()
            .with_networks(self.networks.clone())
            .with_interfaces(self.interfaces.clone());
        match &self.current_ssid {
            Some(ssid) => platform.with_current_ssid(ssid.clone()),
            None => platform,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            current_ssid: None,
            interfaces: default_interfaces(),
        }
    }
}
