use crate::core::error::LedgerError;
use crate::core::state::AppState;
use crate::models::api::{
    EndSessionResponse, PauseSessionResponse, ResumeSessionResponse, SessionIdRequest,
    StartSessionResponse,
};
use crate::models::session::{PauseOutcome, SessionStatus};
use crate::utils::auth::{authenticate, AuthContext};
use crate::utils::time::{current_timestamp, current_timestamp_millis};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Authenticate the caller and charge the request against their rate
/// window. Every rejection is counted before it propagates.
fn begin_request(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, LedgerError> {
    state.metrics.increment_requests();

    let ctx = authenticate(headers, &state.config.auth).map_err(|e| {
        warn!("Rejected unauthenticated session request");
        state.metrics.increment_failed();
        e
    })?;

    if !state
        .rate_limiter
        .check_and_increment(&ctx.user_id, current_timestamp())
    {
        warn!(user_id = %ctx.user_id, "Rate limit exceeded");
        state.metrics.increment_rate_limited();
        return Err(LedgerError::RateLimited);
    }

    Ok(ctx)
}

fn require_session_id(request: &SessionIdRequest) -> Result<&str, LedgerError> {
    if request.session_id.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "session_id is required".to_string(),
        ));
    }
    Ok(&request.session_id)
}

/// Start a new session for the authenticated caller
///
/// POST /session/start
#[instrument(skip(state, headers))]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, LedgerError> {
    let ctx = begin_request(&state, &headers)?;

    let session = state
        .ledger
        .start_session(&ctx.user_id, &ctx.email, current_timestamp_millis())
        .map_err(|e| {
            warn!(user_id = %ctx.user_id, error = %e, "Failed to start session");
            state.metrics.increment_failed();
            e
        })?;

    state.metrics.increment_sessions_started();
    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(StartSessionResponse {
            success: true,
            session_id: session.id,
        }),
    )
        .into_response())
}

/// Pause an active session
///
/// POST /session/pause
#[instrument(skip(state, headers, request))]
pub async fn pause_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SessionIdRequest>,
) -> Result<Response, LedgerError> {
    let ctx = begin_request(&state, &headers)?;
    let session_id = require_session_id(&request).map_err(|e| {
        state.metrics.increment_failed();
        e
    })?;

    let outcome = state
        .ledger
        .pause_session(&ctx.user_id, session_id, current_timestamp_millis())
        .map_err(|e| {
            warn!(
                user_id = %ctx.user_id,
                session_id = %session_id,
                error = %e,
                "Failed to pause session"
            );
            state.metrics.increment_failed();
            e
        })?;

    let message = match outcome {
        PauseOutcome::Paused => "Session paused",
        PauseOutcome::AlreadyPaused => "Session already paused",
    };
    debug!(user_id = %ctx.user_id, session_id = %session_id, "{}", message);

    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(PauseSessionResponse {
            success: true,
            message: message.to_string(),
            status: SessionStatus::Paused.as_str().to_string(),
        }),
    )
        .into_response())
}

/// Resume a paused session
///
/// POST /session/resume
#[instrument(skip(state, headers, request))]
pub async fn resume_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SessionIdRequest>,
) -> Result<Response, LedgerError> {
    let ctx = begin_request(&state, &headers)?;
    let session_id = require_session_id(&request).map_err(|e| {
        state.metrics.increment_failed();
        e
    })?;

    let paused_accumulated_millis = state
        .ledger
        .resume_session(&ctx.user_id, session_id, current_timestamp_millis())
        .map_err(|e| {
            warn!(
                user_id = %ctx.user_id,
                session_id = %session_id,
                error = %e,
                "Failed to resume session"
            );
            state.metrics.increment_failed();
            e
        })?;

    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(ResumeSessionResponse {
            success: true,
            paused_accumulated_millis,
        }),
    )
        .into_response())
}

/// End a session and award points
///
/// POST /session/end
#[instrument(skip(state, headers, request))]
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SessionIdRequest>,
) -> Result<Response, LedgerError> {
    let ctx = begin_request(&state, &headers)?;
    let session_id = require_session_id(&request).map_err(|e| {
        state.metrics.increment_failed();
        e
    })?;

    let receipt = state
        .ledger
        .end_session(&ctx.user_id, session_id, current_timestamp_millis())
        .map_err(|e| {
            warn!(
                user_id = %ctx.user_id,
                session_id = %session_id,
                error = %e,
                "Failed to end session"
            );
            state.metrics.increment_failed();
            e
        })?;

    if receipt.points_awarded {
        state.metrics.increment_sessions_completed();
        state.metrics.increment_points_awarded();
    }
    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(EndSessionResponse {
            success: true,
            total_active_millis: receipt.total_active_millis,
            points_awarded: receipt.points_awarded,
            points: receipt.points,
        }),
    )
        .into_response())
}
