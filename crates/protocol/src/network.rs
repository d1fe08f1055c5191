//! Scanned networks, radio interfaces and the reserved SSID prefix

use serde::{Deserialize, Serialize};

/// Prefix that marks an SSID as a magic network
pub const DEFAULT_SSID_PREFIX: &str = "magic";

/// RSSI at or below which signal quality is 0
pub const RSSI_FLOOR_DBM: i32 = -100;

/// RSSI at or above which signal quality is 100
pub const RSSI_CEILING_DBM: i32 = -50;

/// Matches SSIDs that follow the reserved naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsidFilter {
    prefix: String,
}

impl SsidFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Case-sensitive prefix match
    pub fn matches(&self, ssid: &str) -> bool {
        ssid.starts_with(&self.prefix)
    }
}

impl Default for SsidFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SSID_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityMode {
    Wpa2Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EapMethod {
    Ttls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InnerAuthentication {
    Pap,
}

/// Association requirements of a magic network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityRequirements {
    pub mode: SecurityMode,
    pub eap: EapMethod,
    pub inner: InnerAuthentication,
}

impl SecurityRequirements {
    /// WPA2-Enterprise, EAP-TTLS outer, PAP inner
    pub const MAGIC: Self = Self {
        mode: SecurityMode::Wpa2Enterprise,
        eap: EapMethod::Ttls,
        inner: InnerAuthentication::Pap,
    };
}

impl Default for SecurityRequirements {
    fn default() -> Self {
        Self::MAGIC
    }
}

/// A network seen by a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub ssid: String,

    #[serde(default)]
    pub bssid: Option<String>,

    /// Signal strength in dBm
    pub rssi: i32,

    #[serde(default)]
    pub channel: Option<u16>,

    #[serde(default)]
    pub security: SecurityRequirements,
}

impl NetworkRecord {
    pub fn new(ssid: impl Into<String>, rssi: i32) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: None,
            rssi,
            channel: None,
            security: SecurityRequirements::MAGIC,
        }
    }

    /// Signal quality 0..=100 derived from RSSI
    pub fn quality(&self) -> u8 {
        let clamped = self.rssi.clamp(RSSI_FLOOR_DBM, RSSI_CEILING_DBM);
        map_to_range(
            clamped as f64,
            RSSI_FLOOR_DBM as f64,
            RSSI_CEILING_DBM as f64,
            0.0,
            100.0,
        )
        .round() as u8
    }
}

fn map_to_range(input: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (input - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// A radio interface the platform exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioInterface {
    pub name: String,

    #[serde(default)]
    pub hardware_address: Option<String>,

    #[serde(default = "default_powered")]
    pub powered: bool,
}

fn default_powered() -> bool {
    true
}

impl RadioInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardware_address: None,
            powered: true,
        }
    }
}
