// Centralized error handling for the ledger service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

/// Errors that can occur during session-ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session not found")]
    NotFound,

    #[error("Session does not belong to user")]
    NotOwner,

    #[error("User already has an active session")]
    AlreadyActive,

    #[error("Session already ended")]
    AlreadyEnded,

    #[error("Session is not paused")]
    NotPaused,

    #[error("Session too short: {actual_millis}ms < {min_millis}ms")]
    SessionTooShort { actual_millis: i64, min_millis: i64 },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;

        let (status, error_message) = match &self {
            LedgerError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            LedgerError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            LedgerError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            LedgerError::NotOwner => (StatusCode::FORBIDDEN, self.to_string()),
            LedgerError::AlreadyActive => (StatusCode::CONFLICT, self.to_string()),
            LedgerError::AlreadyEnded => (StatusCode::CONFLICT, self.to_string()),
            LedgerError::NotPaused => (StatusCode::CONFLICT, self.to_string()),
            LedgerError::SessionTooShort { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            LedgerError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            LedgerError::InternalError(e) => {
                // Full detail stays server-side; the caller gets a generic message
                error!(error = %e, "Internal error while handling ledger request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: error_message,
            }),
        )
            .into_response()
    }
}

/// Errors that can occur on the payment path
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Payment system not configured")]
    NotConfigured,

    #[error("Payment not found")]
    NotFound,

    #[error("Payment does not belong to user")]
    NotOwner,

    #[error("Payment verification failed")]
    VerificationFailed,

    #[error("Payment provider unavailable")]
    ProviderError(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;

        let (status, error_message) = match &self {
            PaymentError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            PaymentError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            PaymentError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            PaymentError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            PaymentError::NotOwner => (StatusCode::FORBIDDEN, self.to_string()),
            PaymentError::VerificationFailed => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            PaymentError::ProviderError(detail) => {
                error!(detail = %detail, "Payment provider error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            PaymentError::InternalError(e) => {
                error!(error = %e, "Internal error while handling payment request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: error_message,
            }),
        )
            .into_response()
    }
}
