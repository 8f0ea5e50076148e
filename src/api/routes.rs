//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    http::{StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

/// JSON 404 for unknown routes
async fn fallback_handler(uri: Uri) -> (StatusCode, Json<handlers::ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(handlers::ApiError {
            error: format!("No route for {}", uri.path()),
        }),
    )
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Ledger queries
        .route("/api/accounts/{address}", get(handlers::get_account))
        .route("/api/users/{creator}", get(handlers::get_user))
        .route("/api/multisig/{address}", get(handlers::get_multisig))
        .route(
            "/api/multisig/{address}/transactions",
            get(handlers::get_multisig_transactions),
        )
        .route("/api/transactions/{address}", get(handlers::get_transaction))
        .route("/api/events", get(handlers::get_events))
        // Signed instructions
        .route("/api/instructions", post(handlers::submit_instruction))
        .fallback(fallback_handler)
        .with_state(state)
        .layer(cors)
}
