//! Fungible tokens held in custody alongside native balances
//!
//! # Example
//!
//! ```ignore
//! use shared_custody::token::TokenManager;
//!
//! let mut manager = TokenManager::new();
//! let token = manager.create_token("Dollar".into(), "USD".into(), 6, 1_000_000, &issuer, now)?;
//! manager.transfer(&token.address, &issuer, &multisig, 250, now)?;
//! ```

pub mod manager;
pub mod token;

pub use manager::TokenManager;
pub use token::{Token, TokenError, TokenMetadata, TransferEvent};
