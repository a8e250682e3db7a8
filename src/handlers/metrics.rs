// Metrics endpoint

use crate::core::error::LedgerError;
use crate::core::state::AppState;
use crate::utils::auth::verify_shared_key;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub api_key: String,
}

/// Returns JSON with all service statistics including:
/// - Request totals, success/failure counts, success rate
/// - Sessions started/completed/auto-ended and points awarded
/// - Tracked users, sessions, open sessions, payments
/// - Uptime and requests per second
///
/// Requires the gateway key for authentication.
pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricsQuery>,
) -> Result<Response, LedgerError> {
    if !verify_shared_key(&params.api_key, &state.config.auth.gateway_key) {
        warn!("Unauthorized metrics access attempt");
        return Err(LedgerError::Unauthenticated);
    }

    let snapshot = state
        .metrics
        .get_snapshot(&state.users, &state.sessions, &state.payments);

    Ok((StatusCode::OK, Json(snapshot)).into_response())
}
