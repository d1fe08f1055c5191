//! Hotspot identity and the signer capability

use thiserror::Error;

use crate::address::{Address, keccak256};
use crate::keys::{KeyError, RecoverableSignature, Secp256k1KeyPair};

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Signing unavailable: no key loaded")]
    SigningUnavailable,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Capability that proves possession of the identity key
pub trait Signer: Send + Sync {
    /// Address derived from the key. Empty when no identity exists.
    fn current_address(&self) -> String;

    /// Sign `"auth_" + floor(timestamp)` hashed with Keccak-256
    fn sign(&self, timestamp: f64) -> Result<RecoverableSignature, SignerError>;

    /// True iff both address and key are present
    fn is_valid(&self) -> bool;
}

/// Challenge string signed for a given timestamp
pub fn auth_message(timestamp: f64) -> String {
    format!("auth_{}", timestamp.trunc() as i64)
}

/// Keccak-256 digest of [`auth_message`]
pub fn auth_digest(timestamp: f64) -> [u8; 32] {
    keccak256(auth_message(timestamp).as_bytes())
}

/// The locally held identity: a secp256k1 key and its address
pub struct Identity {
    address: String,
    keypair: Option<Secp256k1KeyPair>,
}

impl Identity {
    /// Generate a fresh identity
    pub fn generate() -> Self {
        Self::from_keypair(Secp256k1KeyPair::generate())
    }

    pub fn from_keypair(keypair: Secp256k1KeyPair) -> Self {
        Self {
            address: keypair.address().to_string(),
            keypair: Some(keypair),
        }
    }

    /// Import an identity from a hex private key
    pub fn from_private_key_hex(private_key: &str) -> Result<Self, KeyError> {
        Secp256k1KeyPair::from_hex(private_key).map(Self::from_keypair)
    }

    /// An identity with neither address nor key; never valid
    pub fn empty() -> Self {
        Self {
            address: String::new(),
            keypair: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// EAP username; the address itself
    pub fn username(&self) -> &str {
        &self.address
    }

    pub(crate) fn keypair(&self) -> Option<&Secp256k1KeyPair> {
        self.keypair.as_ref()
    }

    /// Whether the stored address is the one the key derives
    fn address_matches_key(&self, keypair: &Secp256k1KeyPair) -> bool {
        self.address
            .parse::<Address>()
            .map(|stored| stored == keypair.address())
            .unwrap_or(false)
    }
}

impl Signer for Identity {
    fn current_address(&self) -> String {
        self.address.clone()
    }

    fn sign(&self, timestamp: f64) -> Result<RecoverableSignature, SignerError> {
        let keypair = self.keypair.as_ref().ok_or(SignerError::SigningUnavailable)?;
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(SignerError::InvalidTimestamp(timestamp));
        }
        Ok(keypair.sign_prehash(&auth_digest(timestamp))?)
    }

    // Re-derives the address on every call so a key/address pair that
    // drifted apart after load is reported invalid.
    fn is_valid(&self) -> bool {
        match &self.keypair {
            Some(keypair) => !self.address.is_empty() && self.address_matches_key(keypair),
            None => false,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("has_key", &self.keypair.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_message_floors_timestamp() {
        assert_eq!(auth_message(1571234567.987), "auth_1571234567");
        assert_eq!(auth_message(42.0), "auth_42");
    }

    #[test]
    fn test_generated_identity_is_valid() {
        let identity = Identity::generate();
        assert!(identity.is_valid());
        assert!(identity.address().starts_with("0x"));
        assert_eq!(identity.address().len(), 42);
        assert_eq!(identity.username(), identity.address());
    }

    #[test]
    fn test_empty_identity_is_invalid() {
        let identity = Identity::empty();
        assert!(!identity.is_valid());
        assert!(matches!(identity.sign(1.0), Err(SignerError::SigningUnavailable)));
    }

    #[test]
    fn test_missing_address_is_invalid() {
        let mut identity = Identity::generate();
        identity.address.clear();
        assert!(!identity.is_valid());
    }

    #[test]
    fn test_mismatched_address_is_invalid() {
        let mut identity = Identity::generate();
        identity.address = Identity::generate().address().to_string();
        assert!(!identity.is_valid());
    }

    #[test]
    fn test_signature_recovers_to_identity() {
        let identity = Identity::generate();
        let timestamp = 1_700_000_000.25;

        let signature = identity.sign(timestamp).unwrap();
        let recovered = signature.recover_address(&auth_digest(timestamp)).unwrap();

        assert_eq!(recovered.to_string(), identity.address());
    }

    #[test]
    fn test_signature_is_bound_to_whole_seconds() {
        let identity = Identity::generate();

        let a = identity.sign(100.1).unwrap();
        let b = identity.sign(100.9).unwrap();
        let c = identity.sign(101.0).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_non_finite_timestamp() {
        let identity = Identity::generate();
        assert!(matches!(
            identity.sign(f64::NAN),
            Err(SignerError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_import_private_key() {
        let identity = Identity::from_private_key_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(identity.address(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert!(identity.is_valid());
    }
}
