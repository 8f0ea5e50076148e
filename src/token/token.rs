//! Fungible token mint
//!
//! A mint with a fixed supply and per-holder balances. Multisig custody
//! of a token is simply the balance held under the multisig's address.

use crate::core::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Transfer events retained per mint
const MAX_TRANSFER_HISTORY: usize = 100;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Token not found: {0}")]
    TokenNotFound(Address),
    #[error("Token already exists: {0}")]
    TokenAlreadyExists(Address),
    #[error("Invalid address: cannot transfer to self")]
    SelfTransfer,
    #[error("Balance overflow for holder {0}")]
    Overflow(Address),
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid decimals: must be 0-18")]
    InvalidDecimals,
    #[error("Invalid supply: must be greater than 0")]
    InvalidSupply,
}

/// Token metadata (immutable after creation)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Total supply (fixed at creation)
    pub total_supply: u64,
    /// Identity that received the initial supply
    pub authority: Address,
    /// Ledger time of creation
    pub created_at: i64,
}

impl TokenMetadata {
    /// Create new token metadata with validation
    pub fn new(
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: u64,
        authority: Address,
        created_at: i64,
    ) -> Result<Self, TokenError> {
        if name.is_empty() || name.len() > 50 {
            return Err(TokenError::InvalidName);
        }

        if symbol.is_empty() || symbol.len() > 10 {
            return Err(TokenError::InvalidSymbol);
        }

        if decimals > 18 {
            return Err(TokenError::InvalidDecimals);
        }

        if total_supply == 0 {
            return Err(TokenError::InvalidSupply);
        }

        Ok(Self {
            name,
            symbol,
            decimals,
            total_supply,
            authority,
            created_at,
        })
    }
}

/// Transfer event (recorded on every balance move)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransferEvent {
    pub mint: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub time: i64,
}

/// A fungible token mint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    /// Mint address
    pub address: Address,
    pub metadata: TokenMetadata,
    balances: HashMap<Address, u64>,
    /// Most recent transfers, oldest first
    pub transfer_history: Vec<TransferEvent>,
}

impl Token {
    /// Create a new token with all supply allocated to the authority
    pub fn new(address: Address, metadata: TokenMetadata) -> Self {
        let mut balances = HashMap::new();
        balances.insert(metadata.authority, metadata.total_supply);

        Self {
            address,
            metadata,
            balances,
            transfer_history: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    pub fn total_supply(&self) -> u64 {
        self.metadata.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    /// Move `amount` from one holder to another
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        time: i64,
    ) -> Result<TransferEvent, TokenError> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }

        if from == to {
            return Err(TokenError::SelfTransfer);
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow(*to))?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);

        let event = TransferEvent {
            mint: self.address,
            from: *from,
            to: *to,
            amount,
            time,
        };

        self.transfer_history.push(event.clone());
        if self.transfer_history.len() > MAX_TRANSFER_HISTORY {
            self.transfer_history.remove(0);
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> Address {
        Address::new([1u8; 32])
    }

    fn recipient() -> Address {
        Address::new([2u8; 32])
    }

    fn create_test_token() -> Token {
        let metadata = TokenMetadata::new(
            "Test Token".to_string(),
            "TST".to_string(),
            6,
            1_000_000,
            authority(),
            0,
        )
        .unwrap();

        Token::new(Address::new([9u8; 32]), metadata)
    }

    #[test]
    fn test_token_creation() {
        let token = create_test_token();

        assert_eq!(token.name(), "Test Token");
        assert_eq!(token.symbol(), "TST");
        assert_eq!(token.decimals(), 6);
        assert_eq!(token.total_supply(), 1_000_000);
        assert_eq!(token.balance_of(&authority()), 1_000_000);
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_metadata_validation() {
        let new = |name: &str, symbol: &str, decimals: u8, supply: u64| {
            TokenMetadata::new(
                name.to_string(),
                symbol.to_string(),
                decimals,
                supply,
                authority(),
                0,
            )
        };

        assert_eq!(new("", "TST", 6, 10), Err(TokenError::InvalidName));
        assert_eq!(
            new("Test", "TOOLONGSYMBOL", 6, 10),
            Err(TokenError::InvalidSymbol)
        );
        assert_eq!(new("Test", "TST", 19, 10), Err(TokenError::InvalidDecimals));
        assert_eq!(new("Test", "TST", 6, 0), Err(TokenError::InvalidSupply));
    }

    #[test]
    fn test_transfer() {
        let mut token = create_test_token();

        let event = token.transfer(&authority(), &recipient(), 1000, 42).unwrap();

        assert_eq!(event.amount, 1000);
        assert_eq!(event.time, 42);
        assert_eq!(token.balance_of(&authority()), 999_000);
        assert_eq!(token.balance_of(&recipient()), 1000);
        assert_eq!(token.holder_count(), 2);
        assert_eq!(token.transfer_history.len(), 1);
    }

    #[test]
    fn test_transfer_rejections() {
        let mut token = create_test_token();

        assert_eq!(
            token.transfer(&authority(), &recipient(), 2_000_000, 0),
            Err(TokenError::InsufficientBalance {
                have: 1_000_000,
                need: 2_000_000
            })
        );
        assert_eq!(
            token.transfer(&authority(), &recipient(), 0, 0),
            Err(TokenError::InvalidAmount)
        );
        assert_eq!(
            token.transfer(&authority(), &authority(), 10, 0),
            Err(TokenError::SelfTransfer)
        );
        assert_eq!(token.balance_of(&authority()), 1_000_000);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut token = create_test_token();
        for i in 0..(MAX_TRANSFER_HISTORY as i64 + 5) {
            token.transfer(&authority(), &recipient(), 1, i).unwrap();
        }
        assert_eq!(token.transfer_history.len(), MAX_TRANSFER_HISTORY);
        assert_eq!(token.transfer_history[0].time, 5);
    }
}
