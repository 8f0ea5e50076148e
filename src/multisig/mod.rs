//! Shared-custody multisig program
//!
//! A fixed set of owners jointly controls funds held under a derived
//! address. Any owner may propose a transfer; once a threshold of owners has
//! approved it, any owner may execute it before it expires.
//!
//! # Example
//!
//! ```ignore
//! use shared_custody::multisig::{Asset, MultisigProgram};
//!
//! let program = MultisigProgram::default();
//! program.initialize_user(&mut ledger, &alice, &clock)?;
//! let multisig = program.initialize_multisig(&mut ledger, &alice, vec![alice, bob, carol], 2, &clock)?;
//! program.deposit(&mut ledger, &alice, &multisig, Asset::Native, 1_000, &clock)?;
//!
//! let tx = program.create_transaction(&mut ledger, &alice, &multisig, &dave, Asset::Native, 250, expire_at, &clock)?;
//! program.approve_transaction(&mut ledger, &alice, &tx, &clock)?;
//! program.approve_transaction(&mut ledger, &carol, &tx, &clock)?;
//! program.execute_transaction(&mut ledger, &bob, &dave, &tx, &multisig, Asset::Native, &clock)?;
//! ```

pub mod error;
pub mod events;
pub mod instruction;
pub mod processor;
pub mod program;
pub mod state;

pub use error::MultisigError;
pub use events::ProgramEvent;
pub use instruction::{Instruction, SignedInstruction};
pub use processor::{ProcessError, ProcessOutcome, Processor};
pub use program::{MultisigProgram, ProgramConfig, DEFAULT_PROGRAM_ID};
pub use state::{Asset, Multisig, Transaction, TransactionStatus, User, MAX_OWNERS};
