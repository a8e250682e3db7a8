// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Session lifecycle (authenticated gateway callers)
        .route("/session/start", post(crate::handlers::session::start_session_handler))
        .route("/session/pause", post(crate::handlers::session::pause_session_handler))
        .route("/session/resume", post(crate::handlers::session::resume_session_handler))
        .route("/session/end", post(crate::handlers::session::end_session_handler))

        // Read-only projections
        .route("/leaderboard", get(crate::handlers::leaderboard::leaderboard_handler))

        // Payment path
        .route("/payment/create", post(crate::handlers::payment::create_payment_handler))
        .route("/payment/verify", post(crate::handlers::payment::verify_payment_handler))

        // Operational endpoints
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
