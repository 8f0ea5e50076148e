//! Events emitted by successful program operations

use crate::core::Address;
use crate::multisig::state::Asset;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgramEvent {
    UserInitialized {
        creator: Address,
        user: Address,
        time: i64,
    },
    MultisigInitialized {
        creator: Address,
        multisig: Address,
        owners: usize,
        threshold: u8,
        time: i64,
    },
    Deposited {
        payer: Address,
        multisig: Address,
        asset: Asset,
        amount: u64,
        time: i64,
    },
    TransactionCreated {
        creator: Address,
        transaction: Address,
        amount: u64,
        expire_at: i64,
        time: i64,
    },
    TransactionApproved {
        owner: Address,
        transaction: Address,
        approvals: usize,
        time: i64,
    },
    TransactionCanceled {
        creator: Address,
        transaction: Address,
        time: i64,
    },
    TransactionExecuted {
        executor: Address,
        transaction: Address,
        receiver: Address,
        asset: Asset,
        amount: u64,
        time: i64,
    },
}

impl ProgramEvent {
    pub fn label(&self) -> &'static str {
        match self {
            ProgramEvent::UserInitialized { .. } => "initialize_user",
            ProgramEvent::MultisigInitialized { .. } => "initialize_multisig",
            ProgramEvent::Deposited { .. } => "deposit",
            ProgramEvent::TransactionCreated { .. } => "create_transaction",
            ProgramEvent::TransactionApproved { .. } => "approve_transaction",
            ProgramEvent::TransactionCanceled { .. } => "cancel_transaction",
            ProgramEvent::TransactionExecuted { .. } => "execute_transaction",
        }
    }

    pub fn time(&self) -> i64 {
        match self {
            ProgramEvent::UserInitialized { time, .. }
            | ProgramEvent::MultisigInitialized { time, .. }
            | ProgramEvent::Deposited { time, .. }
            | ProgramEvent::TransactionCreated { time, .. }
            | ProgramEvent::TransactionApproved { time, .. }
            | ProgramEvent::TransactionCanceled { time, .. }
            | ProgramEvent::TransactionExecuted { time, .. } => *time,
        }
    }
}
