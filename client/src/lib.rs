//! Magic Client Library
//!
//! Joins WPA2-Enterprise "magic" hotspots with EAP-TTLS credentials derived
//! from a local secp256k1 identity instead of a typed password.

pub mod agent;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod credentials;
pub mod directory;
pub mod events;

pub use connectivity::ConnectionManager;
pub use context::MagicContext;
pub use credentials::{CredentialDeriver, DeriveError};
pub use directory::NetworkDirectory;
pub use events::{EventSink, StatusBus};
