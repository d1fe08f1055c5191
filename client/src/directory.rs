//! Nearby magic networks and the live association view

use magic_platform::SharedWifiPlatform;
use magic_protocol::{NetworkError, NetworkRecord, RadioInterface, SsidFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct NetworkDirectory {
    platform: SharedWifiPlatform,
    filter: SsidFilter,
    records: RwLock<Vec<NetworkRecord>>,
}

impl NetworkDirectory {
    pub fn new(platform: SharedWifiPlatform, filter: SsidFilter) -> Self {
        Self {
            platform,
            filter,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn filter(&self) -> &SsidFilter {
        &self.filter
    }

    pub fn is_magic(&self, ssid: &str) -> bool {
        self.filter.matches(ssid)
    }

    /// Scan and replace the record set.
    ///
    /// On failure the previous records stay in place.
    pub async fn scan(&self) -> Result<Vec<NetworkRecord>, NetworkError> {
        let found = match self.platform.scan(&self.filter).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Network scan failed: {}", e);
                return Err(NetworkError::ScanFailed);
            }
        };

        let records = collapse(found, &self.filter);
        debug!("Scan found {} magic networks", records.len());
        *self.records.write() = records.clone();
        Ok(records)
    }

    /// Records from the last successful scan, strongest first
    pub fn networks(&self) -> Vec<NetworkRecord> {
        self.records.read().clone()
    }

    pub fn best_candidate(&self) -> Option<NetworkRecord> {
        self.records.read().first().cloned()
    }

    /// SSID the radio is on; `None` when not associated
    pub async fn current_ssid(&self) -> Option<String> {
        self.platform
            .current_ssid()
            .await
            .filter(|ssid| !ssid.is_empty())
    }

    pub fn available_interfaces(&self) -> Vec<RadioInterface> {
        self.platform.interfaces()
    }

    pub fn current_interface(&self) -> Option<RadioInterface> {
        self.platform.current_interface()
    }
}

/// Keep magic SSIDs only, one record per SSID (strongest), sorted by signal
fn collapse(found: Vec<NetworkRecord>, filter: &SsidFilter) -> Vec<NetworkRecord> {
    let mut strongest: HashMap<String, NetworkRecord> = HashMap::new();
    for record in found.into_iter().filter(|r| filter.matches(&r.ssid)) {
        match strongest.get(&record.ssid) {
            Some(existing) if existing.rssi >= record.rssi => {}
            _ => {
                strongest.insert(record.ssid.clone(), record);
            }
        }
    }

    let mut records: Vec<NetworkRecord> = strongest.into_values().collect();
    records.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.ssid.cmp(&b.ssid)));
    records
}
