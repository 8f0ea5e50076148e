//! REST API handlers for ledger queries and instruction submission

use crate::core::{AccountData, Address, Clock, Ledger};
use crate::multisig::{
    Multisig, MultisigError, ProcessError, ProcessOutcome, Processor, ProgramEvent,
    SignedInstruction, Transaction, TransactionStatus, User,
};
use crate::storage::Storage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub storage: Arc<Storage>,
    pub processor: Arc<Processor>,
}

impl ApiState {
    pub fn new(ledger: Ledger, storage: Storage, processor: Processor) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            storage: Arc::new(storage),
            processor: Arc::new(processor),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub accounts: usize,
    pub events: usize,
    /// Accepted instructions kept for replay protection
    pub instructions: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct TokenBalance {
    pub mint: Address,
    pub symbol: String,
    pub balance: u64,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub address: Address,
    pub lamports: u64,
    pub kind: &'static str,
    pub data: AccountData,
    pub tokens: Vec<TokenBalance>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub address: Address,
    #[serde(flatten)]
    pub user: User,
    pub multisigs: Vec<Address>,
}

#[derive(Serialize)]
pub struct MultisigResponse {
    pub address: Address,
    #[serde(flatten)]
    pub multisig: Multisig,
    pub native_custody: u64,
    pub token_custody: Vec<TokenBalance>,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub address: Address,
    pub status: TransactionStatus,
    pub approvals: usize,
    pub approved_by: Vec<Address>,
    #[serde(flatten)]
    pub transaction: Transaction,
}

impl TransactionResponse {
    fn new(address: Address, transaction: &Transaction, now: i64) -> Self {
        Self {
            address,
            status: transaction.status(now),
            approvals: transaction.approval_count(),
            approved_by: transaction.approvers(),
            transaction: transaction.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct InstructionResponse {
    pub accepted: bool,
    pub outcome: ProcessOutcome,
    pub processed_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

fn parse_address(raw: &str) -> Result<Address, (StatusCode, Json<ApiError>)> {
    raw.parse()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid address: {}", e)))
}

fn token_balances(ledger: &Ledger, holder: &Address) -> Vec<TokenBalance> {
    ledger
        .tokens()
        .tokens_for_holder(holder)
        .into_iter()
        .map(|(token, balance)| TokenBalance {
            mint: token.address,
            symbol: token.symbol().to_string(),
            balance,
        })
        .collect()
}

/// HTTP status for a rejected instruction
fn status_for(err: &ProcessError) -> StatusCode {
    match err {
        ProcessError::InvalidSignature => StatusCode::UNAUTHORIZED,
        ProcessError::DuplicateInstruction(_) => StatusCode::CONFLICT,
        ProcessError::Key(_) | ProcessError::Encoding(_) => StatusCode::BAD_REQUEST,
        ProcessError::Program(MultisigError::AccountNotFound(_)) => StatusCode::NOT_FOUND,
        ProcessError::Program(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let ledger = state.ledger.read().await;
    Json(HealthResponse {
        status: "ok",
        accounts: ledger.account_count(),
        events: ledger.events().len(),
        instructions: ledger.processed_count(),
    })
}

/// GET /api/accounts/{address}
pub async fn get_account(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<AccountResponse> {
    let address = parse_address(&address)?;
    let ledger = state.ledger.read().await;

    let account = ledger.account(&address).cloned().unwrap_or_default();
    let tokens = token_balances(&ledger, &address);
    if ledger.account(&address).is_none() && tokens.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Account {} not found", address),
        ));
    }

    Ok(Json(AccountResponse {
        address,
        lamports: account.lamports,
        kind: account.data.kind(),
        data: account.data,
        tokens,
    }))
}

/// GET /api/users/{creator}
pub async fn get_user(
    State(state): State<ApiState>,
    Path(creator): Path<String>,
) -> ApiResult<UserResponse> {
    let creator = parse_address(&creator)?;
    let (address, _) = state
        .processor
        .program()
        .user_address(&creator)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let ledger = state.ledger.read().await;
    let user = ledger
        .user(&address)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?
        .clone();
    let multisigs = ledger
        .multisigs_by_creator(&creator)
        .into_iter()
        .map(|(address, _)| address)
        .collect();

    Ok(Json(UserResponse {
        address,
        user,
        multisigs,
    }))
}

/// GET /api/multisig/{address}
pub async fn get_multisig(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<MultisigResponse> {
    let address = parse_address(&address)?;
    let ledger = state.ledger.read().await;

    let multisig = ledger
        .multisig(&address)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?
        .clone();

    Ok(Json(MultisigResponse {
        address,
        multisig,
        native_custody: ledger.lamports(&address),
        token_custody: token_balances(&ledger, &address),
    }))
}

/// GET /api/multisig/{address}/transactions
pub async fn get_multisig_transactions(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<TransactionResponse>> {
    let address = parse_address(&address)?;
    let ledger = state.ledger.read().await;

    ledger
        .multisig(&address)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;

    let now = Clock::now().unix_timestamp;
    Ok(Json(
        ledger
            .transactions_for(&address)
            .into_iter()
            .map(|(tx_address, tx)| TransactionResponse::new(tx_address, tx, now))
            .collect(),
    ))
}

/// GET /api/transactions/{address}
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<TransactionResponse> {
    let address = parse_address(&address)?;
    let ledger = state.ledger.read().await;

    let transaction = ledger
        .transaction(&address)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;

    Ok(Json(TransactionResponse::new(
        address,
        transaction,
        Clock::now().unix_timestamp,
    )))
}

/// GET /api/events - Most recent events, oldest first
pub async fn get_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<ProgramEvent>> {
    let ledger = state.ledger.read().await;
    let events = ledger.events();
    let limit = query.limit.unwrap_or(100);
    let start = events.len().saturating_sub(limit);

    Json(events[start..].to_vec())
}

/// POST /api/instructions - Apply a signed instruction
pub async fn submit_instruction(
    State(state): State<ApiState>,
    Json(signed): Json<SignedInstruction>,
) -> ApiResult<InstructionResponse> {
    let clock = Clock::now();
    let mut ledger = state.ledger.write().await;

    let outcome = state
        .processor
        .process(&mut ledger, &signed, &clock)
        .map_err(|e| api_error(status_for(&e), e))?;

    if let Err(e) = state.storage.save(&ledger) {
        log::error!("Failed to save ledger: {}", e);
    }

    Ok(Json(InstructionResponse {
        accepted: true,
        outcome,
        processed_at: clock.unix_timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::multisig::{Asset, Instruction};
    use crate::storage::StorageConfig;

    fn test_state(dir: &std::path::Path) -> ApiState {
        let storage = Storage::new(StorageConfig::in_dir(dir)).unwrap();
        ApiState::new(Ledger::new(), storage, Processor::default())
    }

    async fn submit(
        state: &ApiState,
        keypair: &KeyPair,
        instruction: Instruction,
        nonce: u64,
    ) -> ApiResult<InstructionResponse> {
        let signed = SignedInstruction::sign(instruction, nonce, keypair).unwrap();
        submit_instruction(State(state.clone()), Json(signed)).await
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(temp_dir.path());
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        submit(&state, &alice, Instruction::InitializeUser, 0)
            .await
            .unwrap();
        let response = submit(
            &state,
            &alice,
            Instruction::InitializeMultisig {
                owners: vec![alice.address(), bob.address()],
                threshold: 1,
            },
            1,
        )
        .await
        .unwrap();
        let multisig = match response.0.outcome {
            ProcessOutcome::MultisigInitialized { multisig } => multisig,
            ref other => panic!("unexpected outcome {:?}", other),
        };

        let user = get_user(State(state.clone()), Path(alice.address().to_string()))
            .await
            .unwrap();
        assert_eq!(user.0.user.count, 1);
        assert_eq!(user.0.multisigs, vec![multisig]);

        let group = get_multisig(State(state.clone()), Path(multisig.to_string()))
            .await
            .unwrap();
        assert_eq!(group.0.multisig.owners.len(), 2);
        assert_eq!(group.0.native_custody, 0);

        submit(
            &state,
            &bob,
            Instruction::CreateTransaction {
                multisig,
                receiver: alice.address(),
                asset: Asset::Native,
                amount: 5,
                expire_at: Clock::now().unix_timestamp + 600,
            },
            0,
        )
        .await
        .unwrap();

        let proposals =
            get_multisig_transactions(State(state.clone()), Path(multisig.to_string()))
                .await
                .unwrap();
        assert_eq!(proposals.0.len(), 1);
        assert_eq!(proposals.0[0].status, TransactionStatus::Pending);

        let single = get_transaction(State(state.clone()), Path(proposals.0[0].address.to_string()))
            .await
            .unwrap();
        assert_eq!(single.0.transaction.amount, 5);
        assert_eq!(single.0.approvals, 0);

        submit(
            &state,
            &bob,
            Instruction::ApproveTransaction {
                transaction: proposals.0[0].address,
            },
            1,
        )
        .await
        .unwrap();
        let approved = get_transaction(State(state.clone()), Path(proposals.0[0].address.to_string()))
            .await
            .unwrap();
        assert_eq!(approved.0.approved_by, vec![bob.address()]);
        assert_eq!(approved.0.status, TransactionStatus::Approved);

        let events = get_events(State(state.clone()), Query(EventsQuery { limit: Some(2) })).await;
        assert_eq!(events.0.len(), 2);
        assert_eq!(events.0[0].label(), "create_transaction");
        assert_eq!(events.0[1].label(), "approve_transaction");

        let health = health_check(State(state.clone())).await;
        assert_eq!(health.0.instructions, 4);

        assert!(state.storage.exists());
    }

    #[tokio::test]
    async fn test_rejections_map_to_status_codes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(temp_dir.path());
        let alice = KeyPair::generate();

        submit(&state, &alice, Instruction::InitializeUser, 0)
            .await
            .unwrap();
        let replay = submit(&state, &alice, Instruction::InitializeUser, 0).await;
        assert_eq!(replay.err().map(|e| e.0), Some(StatusCode::CONFLICT));

        let again = submit(&state, &alice, Instruction::InitializeUser, 1).await;
        assert_eq!(
            again.err().map(|e| e.0),
            Some(StatusCode::UNPROCESSABLE_ENTITY)
        );

        let missing = submit(
            &state,
            &alice,
            Instruction::ApproveTransaction {
                transaction: Address::new([3u8; 32]),
            },
            2,
        )
        .await;
        assert_eq!(missing.err().map(|e| e.0), Some(StatusCode::NOT_FOUND));

        let mut forged = SignedInstruction::sign(Instruction::InitializeUser, 9, &alice).unwrap();
        forged.signature = hex::encode([0u8; 64]);
        let result = submit_instruction(State(state.clone()), Json(forged)).await;
        assert_eq!(result.err().map(|e| e.0), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_addresses() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(temp_dir.path());

        let bad = get_account(State(state.clone()), Path("not-base58!".to_string())).await;
        let (status, body) = bad.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.0.error.is_empty(), "{:?}", body.0);

        let unknown = Address::new([8u8; 32]).to_string();
        let missing = get_multisig(State(state.clone()), Path(unknown)).await;
        assert_eq!(missing.err().map(|e| e.0), Some(StatusCode::NOT_FOUND));
    }
}
