//! Magic Protocol - Shared data model
//!
//! This crate defines the core data structures of the hotspot client:
//! - `ConnectionStatus` / `NetworkError`: the single live status and its failure taxonomy
//! - `NetworkRecord` / `SsidFilter`: scanned candidates and the reserved SSID prefix
//! - `Credential`: the per-attempt EAP username/password pair
//! - `TrustAnchor` / `TrustConfiguration`: the profile binding an SSID to its server identity

mod credential;
mod network;
mod status;
mod trust;

pub use credential::*;
pub use network::*;
pub use status::*;
pub use trust::*;
