//! User-visible notifications

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const NOTIFY_CONNECT_SUCCESS: &str = "magic.connect.success";
pub const NOTIFY_CONNECT_FAILED: &str = "magic.connect.failed";
pub const NOTIFY_DISCONNECT: &str = "magic.disconnect";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
}

impl Notification {
    pub fn connected(ssid: &str) -> Self {
        Self {
            id: NOTIFY_CONNECT_SUCCESS.to_string(),
            title: "Connected".to_string(),
            subtitle: Some(ssid.to_string()),
            body: format!("Joined {}", ssid),
        }
    }

    pub fn connect_failed(ssid: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            id: NOTIFY_CONNECT_FAILED.to_string(),
            title: "Connection failed".to_string(),
            subtitle: Some(ssid.to_string()),
            body: reason.to_string(),
        }
    }

    pub fn disconnected(ssid: Option<&str>) -> Self {
        Self {
            id: NOTIFY_DISCONNECT.to_string(),
            title: "Disconnected".to_string(),
            subtitle: ssid.map(str::to_string),
            body: match ssid {
                Some(ssid) => format!("Left {}", ssid),
                None => "No magic network".to_string(),
            },
        }
    }
}

/// Delivers notifications to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match &notification.subtitle {
            Some(subtitle) => info!(
                "[{}] {} ({}): {}",
                notification.id, notification.title, subtitle, notification.body
            ),
            None => info!(
                "[{}] {}: {}",
                notification.id, notification.title, notification.body
            ),
        }
    }
}
