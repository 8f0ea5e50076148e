//! In-memory account ledger
//!
//! Holds native balances and program records keyed by address, the token
//! balances, the program event log and the digests of every instruction
//! already applied. Program operations read records, compute their effects
//! and then commit; `transact` adds a snapshot/rollback boundary around a
//! whole operation.

use crate::core::Address;
use crate::multisig::events::ProgramEvent;
use crate::multisig::state::{Multisig, Transaction, User};
use crate::token::TokenManager;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Number of program events retained in the log
pub const MAX_EVENTS: usize = 1000;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(Address),
    #[error("Account {address} does not hold a {expected} record")]
    AccountTypeMismatch {
        address: Address,
        expected: &'static str,
    },
    #[error("Account already allocated: {0}")]
    AlreadyAllocated(Address),
    #[error("Insufficient lamports: have {have}, need {need}")]
    InsufficientLamports { have: u64, need: u64 },
    #[error("Balance overflow on {0}")]
    Overflow(Address),
}

/// Record stored in an account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountData {
    #[default]
    Empty,
    User(User),
    Multisig(Multisig),
    Transaction(Transaction),
}

impl AccountData {
    pub fn kind(&self) -> &'static str {
        match self {
            AccountData::Empty => "empty",
            AccountData::User(_) => "user",
            AccountData::Multisig(_) => "multisig",
            AccountData::Transaction(_) => "transaction",
        }
    }
}

/// A single ledger account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub lamports: u64,
    pub data: AccountData,
}

/// Accounts, token balances and program history
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
    #[serde(default)]
    tokens: TokenManager,
    #[serde(default)]
    events: Vec<ProgramEvent>,
    /// Digests of every accepted instruction. Never pruned: dropping an entry
    /// would let that instruction be replayed.
    #[serde(default)]
    processed: BTreeSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Native balance of an address (zero for unknown accounts)
    pub fn lamports(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.lamports).unwrap_or(0)
    }

    /// Whether a program record lives at this address
    pub fn is_allocated(&self, address: &Address) -> bool {
        self.accounts
            .get(address)
            .map(|a| a.data != AccountData::Empty)
            .unwrap_or(false)
    }

    /// Mint native balance into an account (faucet)
    pub fn credit(&mut self, address: &Address, amount: u64) -> Result<u64, LedgerError> {
        let account = self.accounts.entry(*address).or_default();
        account.lamports = account
            .lamports
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*address))?;
        Ok(account.lamports)
    }

    /// Move native balance between accounts
    pub fn transfer_lamports(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let have = self.lamports(from);
        if have < amount {
            return Err(LedgerError::InsufficientLamports { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .lamports(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        self.accounts.entry(*from).or_default().lamports = have - amount;
        self.accounts.entry(*to).or_default().lamports = to_balance;
        Ok(())
    }

    /// Place a record at a free address
    pub fn allocate(&mut self, address: Address, data: AccountData) -> Result<(), LedgerError> {
        if self.is_allocated(&address) {
            return Err(LedgerError::AlreadyAllocated(address));
        }
        self.accounts.entry(address).or_default().data = data;
        Ok(())
    }

    /// Overwrite the record of an existing account
    pub fn store(&mut self, address: Address, data: AccountData) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&address)
            .ok_or(LedgerError::AccountNotFound(address))?;
        account.data = data;
        Ok(())
    }

    fn data(&self, address: &Address) -> Result<&AccountData, LedgerError> {
        self.accounts
            .get(address)
            .map(|a| &a.data)
            .filter(|d| **d != AccountData::Empty)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    pub fn user(&self, address: &Address) -> Result<&User, LedgerError> {
        match self.data(address)? {
            AccountData::User(user) => Ok(user),
            _ => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "user",
            }),
        }
    }

    pub fn multisig(&self, address: &Address) -> Result<&Multisig, LedgerError> {
        match self.data(address)? {
            AccountData::Multisig(multisig) => Ok(multisig),
            _ => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "multisig",
            }),
        }
    }

    pub fn transaction(&self, address: &Address) -> Result<&Transaction, LedgerError> {
        match self.data(address)? {
            AccountData::Transaction(tx) => Ok(tx),
            _ => Err(LedgerError::AccountTypeMismatch {
                address: *address,
                expected: "transaction",
            }),
        }
    }

    /// Multisig groups created by a given identity, ordered by id
    pub fn multisigs_by_creator(&self, creator: &Address) -> Vec<(Address, &Multisig)> {
        let mut groups: Vec<(Address, &Multisig)> = self
            .accounts
            .iter()
            .filter_map(|(address, account)| match &account.data {
                AccountData::Multisig(m) if m.creator == *creator => Some((*address, m)),
                _ => None,
            })
            .collect();
        groups.sort_by_key(|(_, m)| m.id);
        groups
    }

    /// Proposals of a multisig group, ordered by sequence number
    pub fn transactions_for(&self, multisig: &Address) -> Vec<(Address, &Transaction)> {
        let mut proposals: Vec<(Address, &Transaction)> = self
            .accounts
            .iter()
            .filter_map(|(address, account)| match &account.data {
                AccountData::Transaction(tx) if tx.multisig == *multisig => Some((*address, tx)),
                _ => None,
            })
            .collect();
        proposals.sort_by_key(|(_, tx)| tx.tx_count);
        proposals
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenManager {
        &mut self.tokens
    }

    /// Append to the event log, dropping the oldest entries past the limit
    pub fn emit(&mut self, event: ProgramEvent) {
        log::debug!("event {}", event.label());
        self.events.push(event);
        if self.events.len() > MAX_EVENTS {
            let excess = self.events.len() - MAX_EVENTS;
            self.events.drain(..excess);
        }
    }

    pub fn events(&self) -> &[ProgramEvent] {
        &self.events
    }

    pub fn is_processed(&self, digest: &str) -> bool {
        self.processed.contains(digest)
    }

    pub fn mark_processed(&mut self, digest: String) {
        self.processed.insert(digest);
    }

    /// Number of accepted instructions on record
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Run `f` against the ledger; on error every change it made is undone
    pub fn transact<T, E>(
        &mut self,
        f: impl FnOnce(&mut Ledger) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn test_credit_and_transfer() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 500).unwrap();

        ledger.transfer_lamports(&addr(1), &addr(2), 200).unwrap();
        assert_eq!(ledger.lamports(&addr(1)), 300);
        assert_eq!(ledger.lamports(&addr(2)), 200);

        let result = ledger.transfer_lamports(&addr(1), &addr(2), 301);
        assert_eq!(
            result,
            Err(LedgerError::InsufficientLamports {
                have: 300,
                need: 301
            })
        );
        assert_eq!(ledger.lamports(&addr(1)), 300);
    }

    #[test]
    fn test_credit_overflow() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), u64::MAX).unwrap();
        assert_eq!(
            ledger.credit(&addr(1), 1),
            Err(LedgerError::Overflow(addr(1)))
        );
    }

    #[test]
    fn test_allocate_rejects_occupied_slot() {
        let mut ledger = Ledger::new();
        let user = User {
            creator: addr(9),
            count: 0,
            bump: 255,
        };
        ledger
            .allocate(addr(1), AccountData::User(user.clone()))
            .unwrap();
        assert_eq!(
            ledger.allocate(addr(1), AccountData::User(user)),
            Err(LedgerError::AlreadyAllocated(addr(1)))
        );
        assert!(ledger.user(&addr(1)).is_ok());
        assert!(matches!(
            ledger.multisig(&addr(1)),
            Err(LedgerError::AccountTypeMismatch { .. })
        ));
        assert_eq!(
            ledger.user(&addr(2)),
            Err(LedgerError::AccountNotFound(addr(2)))
        );
    }

    #[test]
    fn test_funded_address_is_not_allocated() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(4), 10).unwrap();
        assert!(!ledger.is_allocated(&addr(4)));
        assert!(matches!(
            ledger.user(&addr(4)),
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_transact_rolls_back_on_error() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 100).unwrap();

        let result: Result<(), LedgerError> = ledger.transact(|l| {
            l.transfer_lamports(&addr(1), &addr(2), 60)?;
            l.transfer_lamports(&addr(1), &addr(3), 60)
        });

        assert!(result.is_err());
        assert_eq!(ledger.lamports(&addr(1)), 100);
        assert_eq!(ledger.lamports(&addr(2)), 0);
    }
}
