//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - ECDSA key management (secp256k1)
//! - Derived (off-curve) account addresses

pub mod derive;
pub mod hash;
pub mod keys;

pub use derive::{create_program_address, find_program_address, DeriveError};
pub use hash::{hashv, sha256, sha256_hex};
pub use keys::{
    public_key_from_hex, public_key_to_address, sign_message, verify_signature, KeyError, KeyPair,
};
