//! Shared-Custody: a threshold multisig engine in Rust
//!
//! A fixed set of owners jointly controls funds held under a derived
//! account, and a quorum of approvals is required before any transfer out
//! of custody executes. This crate provides:
//! - Derived (off-curve) addresses for user, multisig and proposal records
//! - The multisig program: groups, deposits, proposals, approvals,
//!   execution and cancellation with expiry
//! - An in-memory account ledger with rollback, native lamports and
//!   fungible tokens
//! - secp256k1-signed instructions with replay protection
//! - JSON persistence, a local keystore, a CLI and a REST API
//!
//! # Example
//!
//! ```rust
//! use shared_custody::core::{Clock, Ledger};
//! use shared_custody::crypto::KeyPair;
//! use shared_custody::multisig::{Asset, MultisigProgram};
//!
//! let program = MultisigProgram::default();
//! let mut ledger = Ledger::new();
//! let clock = Clock::new(1_700_000_000);
//!
//! let alice = KeyPair::generate().address();
//! let bob = KeyPair::generate().address();
//! let carol = KeyPair::generate().address();
//!
//! program.initialize_user(&mut ledger, &alice, &clock).unwrap();
//! let multisig = program
//!     .initialize_multisig(&mut ledger, &alice, vec![alice, bob], 2, &clock)
//!     .unwrap();
//!
//! ledger.credit(&alice, 1_000).unwrap();
//! program
//!     .deposit(&mut ledger, &alice, &multisig, Asset::Native, 500, &clock)
//!     .unwrap();
//!
//! let tx = program
//!     .create_transaction(&mut ledger, &alice, &multisig, &carol, Asset::Native, 200, clock.unix_timestamp + 3_600, &clock)
//!     .unwrap();
//! program.approve_transaction(&mut ledger, &alice, &tx, &clock).unwrap();
//! program.approve_transaction(&mut ledger, &bob, &tx, &clock).unwrap();
//! program
//!     .execute_transaction(&mut ledger, &bob, &carol, &tx, &multisig, Asset::Native, &clock)
//!     .unwrap();
//!
//! assert_eq!(ledger.lamports(&carol), 200);
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod storage;
pub mod token;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Address, Clock, Ledger};
pub use crypto::{find_program_address, KeyPair};
pub use multisig::{
    Asset, Instruction, MultisigError, MultisigProgram, Processor, SignedInstruction,
};
pub use storage::Storage;
pub use token::{Token, TokenManager, TokenMetadata};
pub use wallet::Keystore;
