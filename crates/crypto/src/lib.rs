//! Magic Crypto - Identity keys and signing
//!
//! This crate provides:
//! - secp256k1 key generation and recoverable signing
//! - Keccak-256 and EIP-55 checksummed addresses
//! - The `Identity` and the `Signer` capability used to derive credentials
//! - Identity stores (file-backed and in-memory)

mod address;
mod identity;
mod keys;
mod store;

pub use address::*;
pub use identity::*;
pub use keys::*;
pub use store::*;
