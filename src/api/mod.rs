//! REST API module
//!
//! HTTP access to the ledger and the multisig program.
//!
//! # Endpoints
//!
//! ## Queries
//! - `GET /health` - Liveness and ledger size
//! - `GET /api/accounts/{address}` - Balance and record of any account
//! - `GET /api/users/{creator}` - User record and the creator's multisig groups
//! - `GET /api/multisig/{address}` - Multisig group with custody balances
//! - `GET /api/multisig/{address}/transactions` - Proposals of a group
//! - `GET /api/transactions/{address}` - One proposal with its status
//! - `GET /api/events?limit=N` - Recent program events
//!
//! ## Instructions
//! - `POST /api/instructions` - Submit a `SignedInstruction`

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
