//! Per-attempt EAP credentials

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum EAP username length accepted by the transport
pub const DEFAULT_MAX_USERNAME_LEN: usize = 253;

/// Maximum EAP password length accepted by the transport
pub const DEFAULT_MAX_PASSWORD_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("EAP username is {len} characters (max: {max})")]
    UsernameTooLong { len: usize, max: usize },

    #[error("EAP password is {len} characters (max: {max})")]
    PasswordTooLong { len: usize, max: usize },

    #[error("EAP username is empty")]
    EmptyUsername,
}

/// Transport length limits for the EAP fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialLimits {
    pub max_username_len: usize,
    pub max_password_len: usize,
}

impl Default for CredentialLimits {
    fn default() -> Self {
        Self {
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            max_password_len: DEFAULT_MAX_PASSWORD_LEN,
        }
    }
}

/// Which EAP field carries which half of the credential.
///
/// A signed password is 141+ characters and cannot fit a 64 character
/// password field, so by default it travels in the username field and the
/// address travels in the password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialLayout {
    /// username field = address, password field = signed password
    Direct,
    /// username field = signed password, password field = address
    #[default]
    Swapped,
}

/// Single-use credential for one connection attempt
#[derive(Clone, PartialEq)]
pub struct Credential {
    username: String,
    password: String,
    issued_at: f64,
    layout: CredentialLayout,
}

impl Credential {
    /// Build without checking limits; see [`Credential::check`]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        issued_at: f64,
        layout: CredentialLayout,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            issued_at,
            layout,
        }
    }

    /// The identity address
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `"<timestamp>-<signature>"`
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Timestamp the password was signed over
    pub fn issued_at(&self) -> f64 {
        self.issued_at
    }

    pub fn layout(&self) -> CredentialLayout {
        self.layout
    }

    /// Value sent in the EAP username field
    pub fn eap_username(&self) -> &str {
        match self.layout {
            CredentialLayout::Direct => &self.username,
            CredentialLayout::Swapped => &self.password,
        }
    }

    /// Value sent in the EAP password field
    pub fn eap_password(&self) -> &str {
        match self.layout {
            CredentialLayout::Direct => &self.password,
            CredentialLayout::Swapped => &self.username,
        }
    }

    /// Check both EAP fields against the transport limits
    pub fn check(&self, limits: &CredentialLimits) -> Result<(), CredentialError> {
        let username_len = self.eap_username().chars().count();
        if username_len == 0 {
            return Err(CredentialError::EmptyUsername);
        }
        if username_len > limits.max_username_len {
            return Err(CredentialError::UsernameTooLong {
                len: username_len,
                max: limits.max_username_len,
            });
        }

        let password_len = self.eap_password().chars().count();
        if password_len > limits.max_password_len {
            return Err(CredentialError::PasswordTooLong {
                len: password_len,
                max: limits.max_password_len,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Join a timestamp and the hex signature over it
pub fn format_password(timestamp: f64, signature_hex: &str) -> String {
    format!("{}-{}", timestamp, signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    fn signed_password() -> String {
        format_password(1571234567.5, &"ab".repeat(65))
    }

    #[test]
    fn test_password_format() {
        assert_eq!(format_password(1571234567.0, "beef"), "1571234567-beef");
        assert_eq!(format_password(1571234567.25, "beef"), "1571234567.25-beef");
    }

    #[test]
    fn test_swapped_layout_fits_default_limits() {
        let credential =
            Credential::new(ADDRESS, signed_password(), 1571234567.5, CredentialLayout::Swapped);

        assert_eq!(credential.eap_username(), credential.password());
        assert_eq!(credential.eap_password(), ADDRESS);
        assert!(credential.check(&CredentialLimits::default()).is_ok());
    }

    #[test]
    fn test_direct_layout_rejects_long_password() {
        let credential =
            Credential::new(ADDRESS, signed_password(), 1571234567.5, CredentialLayout::Direct);

        assert!(matches!(
            credential.check(&CredentialLimits::default()),
            Err(CredentialError::PasswordTooLong { max: 64, .. })
        ));
    }

    #[test]
    fn test_direct_layout_with_relaxed_limits() {
        let credential =
            Credential::new(ADDRESS, signed_password(), 1571234567.5, CredentialLayout::Direct);
        let limits = CredentialLimits {
            max_username_len: 253,
            max_password_len: 256,
        };
        assert!(credential.check(&limits).is_ok());
    }

    #[test]
    fn test_username_limit() {
        let credential = Credential::new(ADDRESS, "x".repeat(300), 0.0, CredentialLayout::Swapped);
        assert!(matches!(
            credential.check(&CredentialLimits::default()),
            Err(CredentialError::UsernameTooLong { len: 300, max: 253 })
        ));
    }

    #[test]
    fn test_empty_username() {
        let credential = Credential::new("", "1-ab", 1.0, CredentialLayout::Direct);
        assert_eq!(
            credential.check(&CredentialLimits::default()),
            Err(CredentialError::EmptyUsername)
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::new(ADDRESS, "1-secret", 1.0, CredentialLayout::Direct);
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret"));
    }
}
