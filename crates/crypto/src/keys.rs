//! secp256k1 key management and recoverable signatures

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::address::Address;

/// Length of a raw secp256k1 secret key
pub const SECRET_KEY_LEN: usize = 32;

/// Length of a recoverable signature (r || s || v)
pub const SIGNATURE_LEN: usize = 65;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Secret key is not a valid secp256k1 scalar")]
    InvalidSecretKey,

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    #[error("Public key recovery failed")]
    RecoveryFailed,
}

/// secp256k1 key pair used as the hotspot identity
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self { signing_key }
    }

    /// Create from secret key bytes
    pub fn from_secret(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() != SECRET_KEY_LEN {
            return Err(KeyError::InvalidKeyLength {
                expected: SECRET_KEY_LEN,
                actual: secret.len(),
            });
        }
        let signing_key = SigningKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex encoded secret key.
    ///
    /// Surrounding whitespace and an optional `0x` prefix are accepted.
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        let trimmed = hex_key.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let secret = hex::decode(digits)?;
        Self::from_secret(&secret)
    }

    /// Get the secret key
    pub fn secret_key(&self) -> [u8; SECRET_KEY_LEN] {
        self.signing_key.to_bytes().into()
    }

    /// Get the uncompressed SEC1 public key (0x04 || x || y)
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Derive the Ethereum-style address of this key
    pub fn address(&self) -> Address {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        Address::from_uncompressed_public_key(point.as_bytes())
    }

    /// Sign a 32-byte digest, producing a recoverable signature.
    ///
    /// Signing is deterministic (RFC 6979): the same key and digest always
    /// yield the same signature.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, KeyError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| KeyError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(signature.to_bytes().as_slice());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }
}

/// 65-byte recoverable signature, `v` stored as `27 + recovery id`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Parse from raw bytes. Accepts `v` as 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        })?;
        let mut normalized = raw;
        if normalized[64] < 27 {
            normalized[64] += 27;
        }
        Ok(Self(normalized))
    }

    /// Parse from a hex string (optional `0x` prefix)
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
        Self::from_bytes(&hex::decode(digits)?)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0
    }

    /// Lowercase hex without prefix (130 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Recover the signer's address from the digest that was signed
    pub fn recover_address(&self, digest: &[u8; 32]) -> Result<Address, KeyError> {
        let v = self.0[64];
        let recovery_id =
            RecoveryId::from_byte(v.wrapping_sub(27)).ok_or(KeyError::InvalidRecoveryId(v))?;
        let signature =
            Signature::from_slice(&self.0[..64]).map_err(|_| KeyError::InvalidSignatureFormat)?;

        let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|_| KeyError::RecoveryFailed)?;
        let point = verifying_key.to_encoded_point(false);
        Ok(Address::from_uncompressed_public_key(point.as_bytes()))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

impl std::fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
