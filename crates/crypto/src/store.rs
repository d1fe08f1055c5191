//! Secure storage for the identity key

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::address::Address;
use crate::identity::{Identity, Signer};
use crate::keys::{KeyError, Secp256k1KeyPair};

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("No identity found in store")]
    NotFound,

    #[error("Stored address {stored} does not match key-derived address {derived}")]
    Mismatch { stored: String, derived: String },

    #[error("Identity data corrupted: {0}")]
    Corrupted(String),

    #[error("Refusing to persist an invalid identity")]
    Invalid,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIdentity {
    address: String,
    private_key: String,
}

impl StoredIdentity {
    fn capture(identity: &Identity) -> Result<Self, IdentityError> {
        if !identity.is_valid() {
            return Err(IdentityError::Invalid);
        }
        let keypair = identity.keypair().ok_or(IdentityError::Invalid)?;
        Ok(Self {
            address: identity.address().to_string(),
            private_key: hex::encode(keypair.secret_key()),
        })
    }

    /// Rebuild the identity, rejecting a key that derives a different address
    fn restore(&self) -> Result<Identity, IdentityError> {
        let keypair = Secp256k1KeyPair::from_hex(&self.private_key)
            .map_err(|e| IdentityError::Corrupted(e.to_string()))?;
        let stored: Address = self
            .address
            .parse()
            .map_err(|e: KeyError| IdentityError::Corrupted(e.to_string()))?;
        let derived = keypair.address();
        if stored != derived {
            return Err(IdentityError::Mismatch {
                stored: self.address.clone(),
                derived: derived.to_string(),
            });
        }
        Ok(Identity::from_keypair(keypair))
    }
}

/// Platform secure storage for the identity
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load the identity, `IdentityError::NotFound` if none was saved
    async fn load(&self) -> Result<Identity, IdentityError>;

    /// Save the identity, replacing any previous one
    async fn persist(&self, identity: &Identity) -> Result<(), IdentityError>;
}

/// JSON file store, written owner-only on unix
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Identity, IdentityError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IdentityError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredIdentity = serde_json::from_str(&content)
            .map_err(|e| IdentityError::Corrupted(e.to_string()))?;
        stored.restore()
    }

    async fn persist(&self, identity: &Identity) -> Result<(), IdentityError> {
        let stored = StoredIdentity::capture(identity)?;
        let content = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-process store, mostly for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<StoredIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw record, bypassing validation
    pub fn insert_raw(&self, address: &str, private_key_hex: &str) {
        *self.slot.lock() = Some(StoredIdentity {
            address: address.to_string(),
            private_key: private_key_hex.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Identity, IdentityError> {
        let stored = self.slot.lock().clone();
        stored.ok_or(IdentityError::NotFound)?.restore()
    }

    async fn persist(&self, identity: &Identity) -> Result<(), IdentityError> {
        let stored = StoredIdentity::capture(identity)?;
        *self.slot.lock() = Some(stored);
        Ok(())
    }
}

/// Load the stored identity, generating a fresh one when none exists.
///
/// A stored key whose address does not match is an error, not a reason to
/// replace the identity.
pub async fn load_or_generate(store: &dyn IdentityStore) -> Result<Identity, IdentityError> {
    match store.load().await {
        Ok(identity) => {
            info!("Loaded identity {}", identity.address());
            Ok(identity)
        }
        Err(IdentityError::NotFound) => {
            let identity = Identity::generate();
            info!("No identity found, generated {}", identity.address());
            Ok(identity)
        }
        Err(e) => Err(e),
    }
}

/// Best-effort save on clean shutdown; failures are logged only
pub async fn persist_on_shutdown(store: &dyn IdentityStore, identity: &Identity) {
    if !identity.is_valid() {
        return;
    }
    match store.persist(identity).await {
        Ok(()) => info!("Saved identity {}", identity.address()),
        Err(e) => warn!("Failed to save identity: {}", e),
    }
}
