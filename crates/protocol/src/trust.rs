//! Trust anchors and the per-SSID trust configuration profile

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::credential::Credential;
use crate::network::{EapMethod, InnerAuthentication, SecurityRequirements};

/// Keychain label of the server certificate
pub const DEFAULT_ANCHOR_LABEL: &str = "Magic Certificate";

/// Organization shown in installed profiles
pub const PROFILE_ORGANIZATION: &str = "Magic.co";

const DER_SEQUENCE: u8 = 0x30;
const PEM_ARMOR: &str = "-----BEGIN";
const UTF8_BOM: char = '\u{feff}';

#[derive(Error, Debug)]
pub enum TrustError {
    #[error("No trust anchor configured")]
    Missing,

    #[error("Certificate is empty")]
    Empty,

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid PEM: {0}")]
    Pem(String),

    #[error("Not a DER certificate (leading byte {0:#04x})")]
    NotDer(u8),
}

/// Server certificate the EAP-TTLS tunnel must present
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    label: String,
    der: Vec<u8>,
}

impl TrustAnchor {
    /// Accepts bytes that open with a DER SEQUENCE tag
    pub fn from_der(label: impl Into<String>, der: Vec<u8>) -> Result<Self, TrustError> {
        match der.first() {
            None => return Err(TrustError::Empty),
            Some(&DER_SEQUENCE) => {}
            Some(&other) => return Err(TrustError::NotDer(other)),
        }
        Ok(Self {
            label: label.into(),
            der,
        })
    }

    pub fn from_base64(label: impl Into<String>, encoded: &str) -> Result<Self, TrustError> {
        let compact: String = encoded.split_whitespace().collect();
        Self::from_der(label, STANDARD.decode(compact)?)
    }

    /// Parse the first CERTIFICATE block of a PEM document
    pub fn from_pem(label: impl Into<String>, pem: &str) -> Result<Self, TrustError> {
        let pem = pem.strip_prefix(UTF8_BOM).unwrap_or(pem);
        let cert = rustls_pemfile::certs(&mut pem.as_bytes())
            .next()
            .ok_or_else(|| TrustError::Pem("no CERTIFICATE block found".to_string()))?
            .map_err(|e| TrustError::Pem(e.to_string()))?;
        Self::from_der(label, cert.to_vec())
    }

    /// PEM when the bytes carry a PEM armor, DER otherwise
    pub fn from_file_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Result<Self, TrustError> {
        match std::str::from_utf8(&bytes) {
            Ok(text) if text.contains(PEM_ARMOR) => Self::from_pem(label, text),
            _ => Self::from_der(label, bytes),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// SHA-256 of the DER encoding, lowercase hex
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("label", &self.label)
            .field("sha256", &self.fingerprint())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_0,
    V1_1,
    V1_2,
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::V1_0 => f.write_str("1.0"),
            TlsVersion::V1_1 => f.write_str("1.1"),
            TlsVersion::V1_2 => f.write_str("1.2"),
        }
    }
}

/// EAP client settings carried by the profile
#[derive(Clone, PartialEq)]
pub struct EapSettings {
    pub eap_types: Vec<EapMethod>,
    pub inner: InnerAuthentication,
    pub username: String,
    pub password: String,
    pub tls_min: TlsVersion,
    pub tls_max: TlsVersion,
    pub trusted_anchor_ids: Vec<Uuid>,
}

impl fmt::Debug for EapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EapSettings")
            .field("eap_types", &self.eap_types)
            .field("inner", &self.inner)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls_min", &self.tls_min)
            .field("tls_max", &self.tls_max)
            .field("trusted_anchor_ids", &self.trusted_anchor_ids)
            .finish()
    }
}

/// Installed profile binding an SSID to its expected server identity
#[derive(Debug, Clone, PartialEq)]
pub struct TrustConfiguration {
    pub profile_id: Uuid,
    pub payload_id: Uuid,
    pub anchor_id: Uuid,
    pub ssid: String,
    pub display_name: String,
    pub organization: String,
    pub security: SecurityRequirements,
    pub eap: EapSettings,
    pub anchor: TrustAnchor,
    pub auto_join: bool,
    pub hidden: bool,
}

impl TrustConfiguration {
    /// Profile for `ssid` using the EAP fields of `credential`
    pub fn new(ssid: &str, credential: &Credential, anchor: &TrustAnchor) -> Self {
        let anchor_id = Uuid::new_v4();
        let security = SecurityRequirements::MAGIC;

        Self {
            profile_id: Uuid::new_v4(),
            payload_id: Uuid::new_v4(),
            anchor_id,
            ssid: ssid.to_string(),
            display_name: format!("{}-{}", ssid, credential.eap_username()),
            organization: PROFILE_ORGANIZATION.to_string(),
            security,
            eap: EapSettings {
                eap_types: vec![security.eap],
                inner: security.inner,
                username: credential.eap_username().to_string(),
                password: credential.eap_password().to_string(),
                tls_min: TlsVersion::V1_0,
                tls_max: TlsVersion::V1_2,
                trusted_anchor_ids: vec![anchor_id],
            },
            anchor: anchor.clone(),
            auto_join: false,
            hidden: false,
        }
    }
}
