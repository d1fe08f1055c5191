//! Per-attempt credential derivation

use magic_crypto::{Signer, SignerError};
use magic_protocol::{
    Credential, CredentialError, CredentialLayout, CredentialLimits, format_password,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Credential rejected: {0}")]
    Invalid(#[from] CredentialError),
}

/// Current time as fractional Unix seconds
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// Turns a timestamp into a one-time EAP credential
#[derive(Clone)]
pub struct CredentialDeriver {
    signer: Arc<dyn Signer>,
    limits: CredentialLimits,
    layout: CredentialLayout,
}

impl CredentialDeriver {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self {
            signer,
            limits: CredentialLimits::default(),
            layout: CredentialLayout::default(),
        }
    }

    pub fn with_limits(mut self, limits: CredentialLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_layout(mut self, layout: CredentialLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    /// Sign `now` and package the result.
    ///
    /// Fails instead of truncating when either EAP field exceeds its limit.
    pub fn derive(&self, now: f64) -> Result<Credential, DeriveError> {
        let signature = self.signer.sign(now)?;
        let credential = Credential::new(
            self.signer.current_address(),
            format_password(now, &signature.to_hex()),
            now,
            self.layout,
        );
        credential.check(&self.limits)?;
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magic_crypto::{Identity, RecoverableSignature, auth_digest};

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    fn deriver() -> CredentialDeriver {
        CredentialDeriver::new(Arc::new(Identity::from_private_key_hex(KEY_ONE).unwrap()))
    }

    #[test]
    fn test_password_is_timestamp_bound() {
        let deriver = deriver();
        let first = deriver.derive(1571234567.0).unwrap();
        let second = deriver.derive(1571234568.0).unwrap();
        let same_second = deriver.derive(1571234567.5).unwrap();

        assert_ne!(first.password(), second.password());
        assert_ne!(first.password(), same_second.password());
        assert_eq!(first.username(), second.username());
    }

    #[test]
    fn test_password_carries_recoverable_signature() {
        let credential = deriver().derive(1571234567.0).unwrap();
        let (timestamp, signature) = credential.password().split_once('-').unwrap();

        assert_eq!(timestamp, "1571234567");
        assert_eq!(signature.len(), 130);

        let signature = RecoverableSignature::from_hex(signature).unwrap();
        let recovered = signature.recover_address(&auth_digest(1571234567.0)).unwrap();
        assert_eq!(recovered.to_string(), credential.username());
    }

    #[test]
    fn test_swapped_layout_fits() {
        let credential = deriver().derive(1571234567.25).unwrap();
        assert_eq!(credential.eap_username(), credential.password());
        assert!(credential.eap_password().len() <= 64);
    }

    #[test]
    fn test_direct_layout_fails_instead_of_truncating() {
        let deriver = deriver().with_layout(CredentialLayout::Direct);
        assert!(matches!(
            deriver.derive(1571234567.0),
            Err(DeriveError::Invalid(CredentialError::PasswordTooLong { .. }))
        ));
    }

    #[test]
    fn test_empty_identity_cannot_derive() {
        let deriver = CredentialDeriver::new(Arc::new(Identity::empty()));
        assert!(matches!(
            deriver.derive(1.0),
            Err(DeriveError::Signing(SignerError::SigningUnavailable))
        ));
    }

    #[test]
    fn test_unix_now_is_recent() {
        assert!(unix_now() > 1_600_000_000.0);
    }
}
