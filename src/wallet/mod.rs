//! Wallet module for identity key management

pub mod keystore;

pub use keystore::{Identity, IdentityInfo, Keystore, KeystoreError};
