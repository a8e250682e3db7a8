use crate::core::error::PaymentError;
use crate::core::state::AppState;
use crate::models::api::{
    CreatePaymentRequest, CreatePaymentResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::models::payment::{Payment, PaymentStatus};
use crate::utils::auth::{authenticate, AuthContext};
use crate::utils::id::new_payment_reference;
use crate::utils::time::current_timestamp_millis;
use crate::wal::wal::WalOperation;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

fn authenticate_caller(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, PaymentError> {
    state.metrics.increment_requests();

    authenticate(headers, &state.config.auth).map_err(|_| {
        warn!("Rejected unauthenticated payment request");
        state.metrics.increment_failed();
        PaymentError::Unauthenticated
    })
}

/// Create a pending payment record and hand its reference to the client
///
/// POST /payment/create
#[instrument(skip(state, headers, request))]
pub async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Response, PaymentError> {
    let ctx = authenticate_caller(&state, &headers)?;

    if state.payment_client.is_none() {
        warn!("Payment request received but no provider secret is configured");
        state.metrics.increment_failed();
        return Err(PaymentError::NotConfigured);
    }

    if request.email.is_empty() {
        state.metrics.increment_failed();
        return Err(PaymentError::InvalidArgument("email is required".to_string()));
    }
    if request.amount <= 0 {
        state.metrics.increment_failed();
        return Err(PaymentError::InvalidArgument(
            "amount must be positive".to_string(),
        ));
    }

    let now_millis = current_timestamp_millis();
    let reference = new_payment_reference(&ctx.user_id, now_millis);
    let payment = Payment::new(
        reference.clone(),
        ctx.user_id.clone(),
        request.email,
        request.amount,
        state.config.payment.currency.clone(),
        now_millis,
    );

    state.payments.upsert(payment.clone());

    if let Err(e) = state.wal.log_operation(WalOperation::UpsertPayment { payment }) {
        warn!(error = %e, "Failed to log payment create to WAL");
        // Continue anyway - the store is updated
    }

    info!(
        user_id = %ctx.user_id,
        reference = %reference,
        amount = request.amount,
        "Payment record created"
    );

    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(CreatePaymentResponse {
            success: true,
            reference,
        }),
    )
        .into_response())
}

/// Confirm a payment against the provider and unlock the user's dashboard
///
/// POST /payment/verify
#[instrument(skip(state, headers, request))]
pub async fn verify_payment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Response, PaymentError> {
    let ctx = authenticate_caller(&state, &headers)?;

    if request.reference.is_empty() {
        state.metrics.increment_failed();
        return Err(PaymentError::InvalidArgument(
            "reference is required".to_string(),
        ));
    }

    let payment = state.payments.get(&request.reference).ok_or_else(|| {
        warn!(reference = %request.reference, "Payment not found");
        state.metrics.increment_failed();
        PaymentError::NotFound
    })?;

    if payment.user_id != ctx.user_id {
        warn!(
            reference = %request.reference,
            user_id = %ctx.user_id,
            "Payment belongs to a different user"
        );
        state.metrics.increment_failed();
        return Err(PaymentError::NotOwner);
    }

    // Retried verifications of a settled payment succeed without another
    // provider round trip
    if payment.is_verified() {
        state.metrics.increment_successful();
        return Ok((
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                success: true,
                amount: payment.amount,
                currency: payment.currency,
            }),
        )
            .into_response());
    }

    let client = state.payment_client.as_ref().ok_or_else(|| {
        warn!("Payment verification requested but no provider secret is configured");
        state.metrics.increment_failed();
        PaymentError::NotConfigured
    })?;

    let transaction = client
        .verify_transaction(&request.reference)
        .await
        .map_err(|e| {
            state.metrics.increment_failed();
            PaymentError::ProviderError(e.to_string())
        })?;

    if transaction.status != "success" {
        warn!(
            reference = %request.reference,
            provider_status = %transaction.status,
            "Provider did not confirm the transaction"
        );
        state.metrics.increment_failed();
        return Err(PaymentError::VerificationFailed);
    }

    let now_millis = current_timestamp_millis();
    let updated = state
        .payments
        .with_payment(&request.reference, |p| {
            p.status = PaymentStatus::Success;
            p.provider_reference = Some(transaction.reference.clone());
            p.amount = transaction.amount;
            p.currency = transaction.currency.clone();
            p.verified_at = Some(now_millis);
            p.clone()
        })
        .ok_or_else(|| {
            state.metrics.increment_failed();
            PaymentError::NotFound
        })?;

    if let Err(e) = state.wal.log_operation(WalOperation::UpsertPayment {
        payment: updated.clone(),
    }) {
        warn!(error = %e, "Failed to log payment verify to WAL");
    }

    match state
        .users
        .mark_paid(&ctx.user_id, &request.reference, now_millis)
    {
        Some(user) => {
            if let Err(e) = state.wal.log_operation(WalOperation::UpsertUser { user }) {
                warn!(error = %e, "Failed to log payment gate to WAL");
            }
        }
        None => {
            warn!(user_id = %ctx.user_id, "Verified payment for unknown user record");
        }
    }

    info!(
        user_id = %ctx.user_id,
        reference = %request.reference,
        amount = updated.amount,
        currency = %updated.currency,
        "Payment verified"
    );

    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(VerifyPaymentResponse {
            success: true,
            amount: updated.amount,
            currency: updated.currency,
        }),
    )
        .into_response())
}
