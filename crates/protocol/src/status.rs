//! Connection status and failure taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a connection operation can fail
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkError {
    #[error("Identity is missing or invalid")]
    InvalidAccount,

    #[error("Could not generate a password for the network")]
    PasswordGenerationFailed,

    #[error("Could not install the network configuration")]
    ConfigInstallFailed,

    #[error("Network configuration was not authorized")]
    ConfigAuthorizationFailed,

    #[error("Could not connect to the network")]
    NetworkConnectionFailed,

    #[error("Network scan failed")]
    ScanFailed,
}

/// The one live connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Pending,
    Connected,
    ScanCompleted,
    Error(NetworkError),
}

impl ConnectionStatus {
    /// Name used when broadcasting this status
    pub fn event_name(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "co.magic.disconnected",
            ConnectionStatus::Pending => "co.magic.pending",
            ConnectionStatus::Connected => "co.magic.connected",
            ConnectionStatus::ScanCompleted => "co.magic.scan.completed",
            ConnectionStatus::Error(_) => "co.magic.error",
        }
    }

    /// Whether this status ends a connect or disconnect operation
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Disconnected | ConnectionStatus::Connected | ConnectionStatus::Error(_)
        )
    }

    pub fn error(&self) -> Option<NetworkError> {
        match self {
            ConnectionStatus::Error(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("disconnected"),
            ConnectionStatus::Pending => f.write_str("pending"),
            ConnectionStatus::Connected => f.write_str("connected"),
            ConnectionStatus::ScanCompleted => f.write_str("scan completed"),
            ConnectionStatus::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(ConnectionStatus::Connected.event_name(), "co.magic.connected");
        assert_eq!(
            ConnectionStatus::ScanCompleted.event_name(),
            "co.magic.scan.completed"
        );
        assert_eq!(
            ConnectionStatus::Error(NetworkError::ScanFailed).event_name(),
            "co.magic.error"
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ConnectionStatus::Connected.is_terminal());
        assert!(ConnectionStatus::Disconnected.is_terminal());
        assert!(ConnectionStatus::Error(NetworkError::InvalidAccount).is_terminal());
        assert!(!ConnectionStatus::Pending.is_terminal());
        assert!(!ConnectionStatus::ScanCompleted.is_terminal());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&ConnectionStatus::Error(
            NetworkError::NetworkConnectionFailed,
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"status":"error","reason":"network_connection_failed"}"#
        );

        let json = serde_json::to_string(&ConnectionStatus::Connected).unwrap();
        assert_eq!(json, r#"{"status":"connected"}"#);
    }
}
