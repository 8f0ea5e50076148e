//! The shared-custody program
//!
//! Each operation validates everything it needs against the current ledger
//! and clock before touching state, then commits inside
//! [`Ledger::transact`] so a failure part-way through a commit is rolled
//! back as well.

use crate::core::{AccountData, Address, Clock, Ledger};
use crate::multisig::error::MultisigError;
use crate::multisig::events::ProgramEvent;
use crate::multisig::state::{Asset, Multisig, Transaction, User, MAX_OWNERS};
use crate::token::TokenError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Program id used when none is configured
pub const DEFAULT_PROGRAM_ID: Address = Address::new(*b"shared-custody-multisig-program!");

/// Program configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Namespace mixed into every derived address
    pub program_id: Address,
    /// Upper bound on the owner set
    pub max_owners: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            max_owners: MAX_OWNERS,
        }
    }
}

/// Stateless program logic; all state lives in the [`Ledger`]
#[derive(Clone, Debug, Default)]
pub struct MultisigProgram {
    config: ProgramConfig,
}

impl MultisigProgram {
    pub fn new(config: ProgramConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    pub fn user_address(&self, creator: &Address) -> Result<(Address, u8), MultisigError> {
        Ok(User::address(creator, self.program_id())?)
    }

    pub fn multisig_address(
        &self,
        creator: &Address,
        id: u64,
    ) -> Result<(Address, u8), MultisigError> {
        Ok(Multisig::address(creator, id, self.program_id())?)
    }

    pub fn transaction_address(
        &self,
        multisig: &Address,
        tx_count: u64,
    ) -> Result<(Address, u8), MultisigError> {
        Ok(Transaction::address(multisig, tx_count, self.program_id())?)
    }

    /// Amount of `asset` held in custody by a multisig
    pub fn custody_balance(
        &self,
        ledger: &Ledger,
        multisig: &Address,
        asset: &Asset,
    ) -> Result<u64, MultisigError> {
        match asset {
            Asset::Native => Ok(ledger.lamports(multisig)),
            Asset::Token(mint) => Ok(ledger.tokens().balance_of(mint, multisig)?),
        }
    }

    /// Create the creator's registry record
    pub fn initialize_user(
        &self,
        ledger: &mut Ledger,
        creator: &Address,
        clock: &Clock,
    ) -> Result<Address, MultisigError> {
        let (address, bump) = self.user_address(creator)?;
        if ledger.is_allocated(&address) {
            return Err(MultisigError::AlreadyInitialized(address));
        }

        let user = User {
            creator: *creator,
            count: 0,
            bump,
        };

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            ledger.allocate(address, AccountData::User(user))?;
            ledger.emit(ProgramEvent::UserInitialized {
                creator: *creator,
                user: address,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        log::info!("User initialized: {} for {}", address, creator.short());
        Ok(address)
    }

    /// Create a multisig group owned by `owners`
    pub fn initialize_multisig(
        &self,
        ledger: &mut Ledger,
        creator: &Address,
        owners: Vec<Address>,
        threshold: u8,
        clock: &Clock,
    ) -> Result<Address, MultisigError> {
        let (user_address, _) = self.user_address(creator)?;
        let mut user = ledger.user(&user_address)?.clone();

        if owners.is_empty() || owners.len() > self.config.max_owners {
            return Err(MultisigError::InvalidOwnersLen {
                count: owners.len(),
                max: self.config.max_owners,
            });
        }

        let mut seen = HashSet::new();
        for owner in &owners {
            if !seen.insert(owner) {
                return Err(MultisigError::DuplicateOwner(*owner));
            }
        }

        if threshold == 0 || threshold as usize > owners.len() {
            return Err(MultisigError::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }

        if !owners.contains(creator) {
            return Err(MultisigError::NotAnOwner(*creator));
        }

        let id = user.count;
        let (address, bump) = self.multisig_address(creator, id)?;
        if ledger.is_allocated(&address) {
            return Err(MultisigError::AddressAlreadyInUse(address));
        }

        let multisig = Multisig {
            creator: *creator,
            id,
            owners,
            threshold,
            tx_count: 0,
            bump,
        };
        let owner_count = multisig.owners.len();
        user.count += 1;

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            ledger.allocate(address, AccountData::Multisig(multisig))?;
            ledger.store(user_address, AccountData::User(user))?;
            ledger.emit(ProgramEvent::MultisigInitialized {
                creator: *creator,
                multisig: address,
                owners: owner_count,
                threshold,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        log::info!(
            "Multisig created: {} ({}-of-{}, id {})",
            address,
            threshold,
            owner_count,
            id
        );
        Ok(address)
    }

    /// Move funds from `payer` into a multisig's custody; returns the new custody balance
    pub fn deposit(
        &self,
        ledger: &mut Ledger,
        payer: &Address,
        multisig: &Address,
        asset: Asset,
        amount: u64,
        clock: &Clock,
    ) -> Result<u64, MultisigError> {
        if amount == 0 {
            return Err(MultisigError::InvalidAmount);
        }
        ledger.multisig(multisig)?;

        let have = match &asset {
            Asset::Native => ledger.lamports(payer),
            Asset::Token(mint) => ledger.tokens().balance_of(mint, payer)?,
        };
        if have < amount {
            return Err(MultisigError::InsufficientFunds { have, need: amount });
        }

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            match &asset {
                Asset::Native => ledger.transfer_lamports(payer, multisig, amount)?,
                Asset::Token(mint) => {
                    ledger.tokens_mut().transfer(
                        mint,
                        payer,
                        multisig,
                        amount,
                        clock.unix_timestamp,
                    )?;
                }
            }
            ledger.emit(ProgramEvent::Deposited {
                payer: *payer,
                multisig: *multisig,
                asset,
                amount,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        let custody = self.custody_balance(ledger, multisig, &asset)?;
        log::info!(
            "Deposited {} ({}) into {}; custody now {}",
            amount,
            asset,
            multisig.short(),
            custody
        );
        Ok(custody)
    }

    /// Propose a transfer out of custody
    #[allow(clippy::too_many_arguments)]
    pub fn create_transaction(
        &self,
        ledger: &mut Ledger,
        creator: &Address,
        multisig_address: &Address,
        receiver: &Address,
        asset: Asset,
        amount: u64,
        expire_at: i64,
        clock: &Clock,
    ) -> Result<Address, MultisigError> {
        let mut multisig = ledger.multisig(multisig_address)?.clone();

        if !multisig.is_owner(creator) {
            return Err(MultisigError::NotAnOwner(*creator));
        }
        if amount == 0 {
            return Err(MultisigError::InvalidAmount);
        }
        if receiver == multisig_address {
            return Err(MultisigError::InvalidReceiver(*receiver));
        }
        let now = clock.unix_timestamp;
        if expire_at <= now {
            return Err(MultisigError::InvalidExpiry { expire_at, now });
        }
        if let Asset::Token(mint) = &asset {
            if !ledger.tokens().exists(mint) {
                return Err(TokenError::TokenNotFound(*mint).into());
            }
        }

        let tx_count = multisig.tx_count;
        let (address, bump) = self.transaction_address(multisig_address, tx_count)?;
        if ledger.is_allocated(&address) {
            return Err(MultisigError::AddressAlreadyInUse(address));
        }

        let transaction = Transaction {
            multisig: *multisig_address,
            creator: *creator,
            receiver: *receiver,
            asset,
            amount,
            tx_count,
            signs: vec![false; multisig.owners.len()],
            owners: multisig.owners.clone(),
            threshold: multisig.threshold,
            expire_at,
            is_executed: false,
            is_canceled: false,
            bump,
        };
        multisig.tx_count += 1;

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            ledger.allocate(address, AccountData::Transaction(transaction))?;
            ledger.store(*multisig_address, AccountData::Multisig(multisig))?;
            ledger.emit(ProgramEvent::TransactionCreated {
                creator: *creator,
                transaction: address,
                amount,
                expire_at,
                time: now,
            });
            Ok(())
        })?;

        log::info!(
            "Proposal #{} created: {} sends {} ({}) to {}",
            tx_count,
            address,
            amount,
            asset,
            receiver.short()
        );
        Ok(address)
    }

    /// Record an owner's approval; returns the number of approvals
    pub fn approve_transaction(
        &self,
        ledger: &mut Ledger,
        owner: &Address,
        transaction_address: &Address,
        clock: &Clock,
    ) -> Result<usize, MultisigError> {
        let mut transaction = ledger.transaction(transaction_address)?.clone();

        let index = transaction
            .owner_index(owner)
            .ok_or(MultisigError::NotAnOwner(*owner))?;
        transaction.ensure_active(clock.unix_timestamp)?;

        if transaction.signs[index] {
            log::debug!(
                "{} already approved {}",
                owner.short(),
                transaction_address.short()
            );
            return Ok(transaction.approval_count());
        }

        transaction.signs[index] = true;
        let approvals = transaction.approval_count();

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            ledger.store(*transaction_address, AccountData::Transaction(transaction))?;
            ledger.emit(ProgramEvent::TransactionApproved {
                owner: *owner,
                transaction: *transaction_address,
                approvals,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        log::info!(
            "Approval by {} on {} ({} so far)",
            owner.short(),
            transaction_address.short(),
            approvals
        );
        Ok(approvals)
    }

    /// Withdraw a proposal; only its proposer may do so
    pub fn cancel_transaction(
        &self,
        ledger: &mut Ledger,
        creator: &Address,
        transaction_address: &Address,
        clock: &Clock,
    ) -> Result<(), MultisigError> {
        let mut transaction = ledger.transaction(transaction_address)?.clone();

        if transaction.creator != *creator {
            return Err(MultisigError::NotProposer(*creator));
        }
        transaction.ensure_active(clock.unix_timestamp)?;

        transaction.is_canceled = true;

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            ledger.store(*transaction_address, AccountData::Transaction(transaction))?;
            ledger.emit(ProgramEvent::TransactionCanceled {
                creator: *creator,
                transaction: *transaction_address,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        log::info!("Proposal {} canceled", transaction_address);
        Ok(())
    }

    /// Pay out an approved proposal from custody
    #[allow(clippy::too_many_arguments)]
    pub fn execute_transaction(
        &self,
        ledger: &mut Ledger,
        executor: &Address,
        receiver: &Address,
        transaction_address: &Address,
        multisig_address: &Address,
        asset: Asset,
        clock: &Clock,
    ) -> Result<(), MultisigError> {
        let mut transaction = ledger.transaction(transaction_address)?.clone();

        if transaction.owner_index(executor).is_none() {
            return Err(MultisigError::NotAnOwner(*executor));
        }
        transaction.ensure_active(clock.unix_timestamp)?;

        if transaction.multisig != *multisig_address {
            return Err(MultisigError::MultisigMismatch {
                expected: transaction.multisig,
                actual: *multisig_address,
            });
        }
        ledger.multisig(multisig_address)?;

        if transaction.receiver != *receiver {
            return Err(MultisigError::ReceiverMismatch {
                expected: transaction.receiver,
                actual: *receiver,
            });
        }
        if transaction.asset != asset {
            return Err(MultisigError::AssetMismatch {
                expected: transaction.asset.to_string(),
                actual: asset.to_string(),
            });
        }

        let approvals = transaction.approval_count();
        if !transaction.is_approved() {
            return Err(MultisigError::ThresholdNotMet {
                approvals,
                threshold: transaction.threshold,
            });
        }

        let amount = transaction.amount;
        let have = self.custody_balance(ledger, multisig_address, &asset)?;
        if have < amount {
            return Err(MultisigError::InsufficientCustodyFunds { have, need: amount });
        }

        transaction.is_executed = true;

        ledger.transact(|ledger| -> Result<(), MultisigError> {
            match &asset {
                Asset::Native => ledger.transfer_lamports(multisig_address, receiver, amount)?,
                Asset::Token(mint) => {
                    ledger.tokens_mut().transfer(
                        mint,
                        multisig_address,
                        receiver,
                        amount,
                        clock.unix_timestamp,
                    )?;
                }
            }
            ledger.store(*transaction_address, AccountData::Transaction(transaction))?;
            ledger.emit(ProgramEvent::TransactionExecuted {
                executor: *executor,
                transaction: *transaction_address,
                receiver: *receiver,
                asset,
                amount,
                time: clock.unix_timestamp,
            });
            Ok(())
        })?;

        log::info!(
            "Proposal {} executed: {} ({}) to {} with {} approvals",
            transaction_address,
            amount,
            asset,
            receiver.short(),
            approvals
        );
        Ok(())
    }
}
