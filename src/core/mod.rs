//! Core ledger components
//!
//! This module contains the building blocks the program runs on:
//! - Addresses (Base58, 32 bytes)
//! - The ledger clock
//! - The account ledger with rollback support

pub mod address;
pub mod clock;
pub mod ledger;

pub use address::{Address, AddressError};
pub use clock::Clock;
pub use ledger::{Account, AccountData, Ledger, LedgerError, MAX_EVENTS};
