//! Instruction processor
//!
//! Authenticates a [`SignedInstruction`], rejects replays, and applies it to
//! the ledger as a single atomic step.

use crate::core::{Address, Clock, Ledger};
use crate::crypto::KeyError;
use crate::multisig::error::MultisigError;
use crate::multisig::instruction::{Instruction, SignedInstruction};
use crate::multisig::program::MultisigProgram;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while processing a signed instruction
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Duplicate instruction: {0}")]
    DuplicateInstruction(String),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Program error: {0}")]
    Program(#[from] MultisigError),
}

/// What an accepted instruction produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProcessOutcome {
    UserInitialized { user: Address },
    MultisigInitialized { multisig: Address },
    Deposited { custody: u64 },
    TransactionCreated { transaction: Address },
    TransactionApproved { approvals: usize },
    TransactionCanceled,
    TransactionExecuted,
    TokenCreated { mint: Address },
    TokenTransferred,
}

/// Applies signed instructions through the multisig program
#[derive(Clone, Debug, Default)]
pub struct Processor {
    program: MultisigProgram,
}

impl Processor {
    pub fn new(program: MultisigProgram) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &MultisigProgram {
        &self.program
    }

    /// Verify, de-duplicate and apply one instruction
    pub fn process(
        &self,
        ledger: &mut Ledger,
        signed: &SignedInstruction,
        clock: &Clock,
    ) -> Result<ProcessOutcome, ProcessError> {
        let name = signed.instruction.name();
        let result = self.try_process(ledger, signed, clock);

        match &result {
            Ok(outcome) => log::debug!("{} accepted: {:?}", name, outcome),
            Err(e) => log::warn!("{} rejected: {}", name, e),
        }
        result
    }

    fn try_process(
        &self,
        ledger: &mut Ledger,
        signed: &SignedInstruction,
        clock: &Clock,
    ) -> Result<ProcessOutcome, ProcessError> {
        let signer = signed.verify()?;
        let digest = signed.digest()?;

        if ledger.is_processed(&digest) {
            return Err(ProcessError::DuplicateInstruction(digest));
        }

        ledger.transact(|ledger| -> Result<ProcessOutcome, ProcessError> {
            let outcome = self.dispatch(ledger, &signer, &signed.instruction, clock)?;
            ledger.mark_processed(digest);
            Ok(outcome)
        })
    }

    fn dispatch(
        &self,
        ledger: &mut Ledger,
        signer: &Address,
        instruction: &Instruction,
        clock: &Clock,
    ) -> Result<ProcessOutcome, MultisigError> {
        let program = &self.program;

        let outcome = match instruction {
            Instruction::InitializeUser => ProcessOutcome::UserInitialized {
                user: program.initialize_user(ledger, signer, clock)?,
            },
            Instruction::InitializeMultisig { owners, threshold } => {
                ProcessOutcome::MultisigInitialized {
                    multisig: program.initialize_multisig(
                        ledger,
                        signer,
                        owners.clone(),
                        *threshold,
                        clock,
                    )?,
                }
            }
            Instruction::Deposit {
                multisig,
                asset,
                amount,
            } => ProcessOutcome::Deposited {
                custody: program.deposit(ledger, signer, multisig, *asset, *amount, clock)?,
            },
            Instruction::CreateTransaction {
                multisig,
                receiver,
                asset,
                amount,
                expire_at,
            } => ProcessOutcome::TransactionCreated {
                transaction: program.create_transaction(
                    ledger, signer, multisig, receiver, *asset, *amount, *expire_at, clock,
                )?,
            },
            Instruction::ApproveTransaction { transaction } => {
                ProcessOutcome::TransactionApproved {
                    approvals: program.approve_transaction(ledger, signer, transaction, clock)?,
                }
            }
            Instruction::CancelTransaction { transaction } => {
                program.cancel_transaction(ledger, signer, transaction, clock)?;
                ProcessOutcome::TransactionCanceled
            }
            Instruction::ExecuteTransaction {
                transaction,
                multisig,
                receiver,
                asset,
            } => {
                program.execute_transaction(
                    ledger,
                    signer,
                    receiver,
                    transaction,
                    multisig,
                    *asset,
                    clock,
                )?;
                ProcessOutcome::TransactionExecuted
            }
            Instruction::CreateToken {
                name,
                symbol,
                decimals,
                total_supply,
            } => {
                let token = ledger.tokens_mut().create_token(
                    name.clone(),
                    symbol.clone(),
                    *decimals,
                    *total_supply,
                    signer,
                    clock.unix_timestamp,
                )?;
                ProcessOutcome::TokenCreated {
                    mint: token.address,
                }
            }
            Instruction::TransferToken { mint, to, amount } => {
                ledger
                    .tokens_mut()
                    .transfer(mint, signer, to, *amount, clock.unix_timestamp)?;
                ProcessOutcome::TokenTransferred
            }
        };

        Ok(outcome)
    }
}
