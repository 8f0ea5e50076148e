//! Multisig program errors

use crate::core::{Address, LedgerError};
use crate::crypto::DeriveError;
use crate::token::TokenError;
use thiserror::Error;

/// Errors returned by program operations; none of them leave partial state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Account already initialized: {0}")]
    AlreadyInitialized(Address),
    #[error("Address already in use: {0}")]
    AddressAlreadyInUse(Address),
    #[error("Invalid number of owners: {count} (must be 1-{max})")]
    InvalidOwnersLen { count: usize, max: usize },
    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Address),
    #[error("Invalid threshold: {threshold} (must be 1-{owners})")]
    InvalidThreshold { threshold: u8, owners: usize },
    #[error("Not an owner: {0}")]
    NotAnOwner(Address),
    #[error("Only the proposer can cancel: {0}")]
    NotProposer(Address),
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Receiver cannot be the multisig's own custody: {0}")]
    InvalidReceiver(Address),
    #[error("Invalid expiry: {expire_at} is not after {now}")]
    InvalidExpiry { expire_at: i64, now: i64 },
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Insufficient custody funds: have {have}, need {need}")]
    InsufficientCustodyFunds { have: u64, need: u64 },
    #[error("Transaction already executed")]
    AlreadyExecuted,
    #[error("Transaction canceled")]
    Canceled,
    #[error("Transaction expired at {expire_at} (now {now})")]
    Expired { expire_at: i64, now: i64 },
    #[error("Threshold not met: {approvals} of {threshold} approvals")]
    ThresholdNotMet { approvals: usize, threshold: u8 },
    #[error("Receiver mismatch: expected {expected}, got {actual}")]
    ReceiverMismatch { expected: Address, actual: Address },
    #[error("Multisig mismatch: expected {expected}, got {actual}")]
    MultisigMismatch { expected: Address, actual: Address },
    #[error("Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: String, actual: String },
    #[error("Account not found: {0}")]
    AccountNotFound(Address),
    #[error("Account {address} does not hold a {expected} record")]
    AccountTypeMismatch {
        address: Address,
        expected: &'static str,
    },
    #[error("Address derivation exhausted every bump")]
    AddressDerivationExhausted,
    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for MultisigError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(address) => MultisigError::AccountNotFound(address),
            LedgerError::AccountTypeMismatch { address, expected } => {
                MultisigError::AccountTypeMismatch { address, expected }
            }
            LedgerError::AlreadyAllocated(address) => MultisigError::AddressAlreadyInUse(address),
            other => MultisigError::Ledger(other),
        }
    }
}

impl From<DeriveError> for MultisigError {
    fn from(err: DeriveError) -> Self {
        match err {
            DeriveError::Exhausted => MultisigError::AddressDerivationExhausted,
            other => MultisigError::InvalidSeeds(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_mapping() {
        let address = Address::new([1u8; 32]);
        assert_eq!(
            MultisigError::from(LedgerError::AccountNotFound(address)),
            MultisigError::AccountNotFound(address)
        );
        assert_eq!(
            MultisigError::from(LedgerError::AlreadyAllocated(address)),
            MultisigError::AddressAlreadyInUse(address)
        );
        assert!(matches!(
            MultisigError::from(LedgerError::Overflow(address)),
            MultisigError::Ledger(LedgerError::Overflow(_))
        ));
    }

    #[test]
    fn test_derive_error_mapping() {
        assert_eq!(
            MultisigError::from(DeriveError::Exhausted),
            MultisigError::AddressDerivationExhausted
        );
        assert!(matches!(
            MultisigError::from(DeriveError::TooManySeeds { count: 17 }),
            MultisigError::InvalidSeeds(_)
        ));
    }
}
