//! Connectivity change notifications raised by the platform

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Wifi,
    Cellular,
    Wired,
    Other,
}

/// Snapshot of the default route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reachability {
    pub reachable: bool,
    pub transport: Transport,
}

impl Reachability {
    pub fn wifi() -> Self {
        Self {
            reachable: true,
            transport: Transport::Wifi,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            transport: Transport::Other,
        }
    }

    pub fn cellular() -> Self {
        Self {
            reachable: true,
            transport: Transport::Cellular,
        }
    }

    /// Reachable over Wi-Fi, the only transport a magic network provides
    pub fn is_preferred(&self) -> bool {
        self.reachable && self.transport == Transport::Wifi
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    LinkChanged(Reachability),
    SsidChanged(Option<String>),
    ScanCacheUpdated,
}
