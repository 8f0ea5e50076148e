//! Token manager for creating and moving fungible tokens

use crate::core::Address;
use crate::crypto::hashv;
use crate::token::token::{Token, TokenError, TokenMetadata, TransferEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Manages all mints on the ledger
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenManager {
    /// All tokens by mint address
    tokens: HashMap<Address, Token>,
    /// Creation counter for address generation
    nonce: u64,
}

impl TokenManager {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
            nonce: 0,
        }
    }

    /// Create a new token; the full supply goes to `authority`
    pub fn create_token(
        &mut self,
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: u64,
        authority: &Address,
        time: i64,
    ) -> Result<Token, TokenError> {
        let metadata = TokenMetadata::new(name, symbol, decimals, total_supply, *authority, time)?;

        let address = self.generate_address(authority, &metadata.symbol);
        self.nonce += 1;

        if self.tokens.contains_key(&address) {
            return Err(TokenError::TokenAlreadyExists(address));
        }

        let token = Token::new(address, metadata);
        self.tokens.insert(address, token.clone());

        log::info!(
            "Token created: {} ({}) at {}",
            token.name(),
            token.symbol(),
            address
        );

        Ok(token)
    }

    /// Mint address from authority, symbol and the creation counter
    fn generate_address(&self, authority: &Address, symbol: &str) -> Address {
        Address::new(hashv(&[
            b"mint".as_slice(),
            authority.as_ref(),
            symbol.as_bytes(),
            &self.nonce.to_le_bytes(),
        ]))
    }

    pub fn get(&self, mint: &Address) -> Option<&Token> {
        self.tokens.get(mint)
    }

    pub fn list(&self) -> Vec<&Token> {
        self.tokens.values().collect()
    }

    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    pub fn exists(&self, mint: &Address) -> bool {
        self.tokens.contains_key(mint)
    }

    pub fn transfer(
        &mut self,
        mint: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
        time: i64,
    ) -> Result<TransferEvent, TokenError> {
        let token = self
            .tokens
            .get_mut(mint)
            .ok_or(TokenError::TokenNotFound(*mint))?;

        token.transfer(from, to, amount, time)
    }

    pub fn balance_of(&self, mint: &Address, holder: &Address) -> Result<u64, TokenError> {
        let token = self
            .tokens
            .get(mint)
            .ok_or(TokenError::TokenNotFound(*mint))?;

        Ok(token.balance_of(holder))
    }

    /// All tokens held by an address with their balances
    pub fn tokens_for_holder(&self, holder: &Address) -> Vec<(&Token, u64)> {
        self.tokens
            .values()
            .filter_map(|token| {
                let balance = token.balance_of(holder);
                if balance > 0 {
                    Some((token, balance))
                } else {
                    None
                }
            })
            .collect()
    }
}
