//! Payment initiation and the provider redirect callback.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use validator::Validate;

use crate::dtos::{CallbackParams, InitiatePaymentRequest, InitiatePaymentResponse};
use crate::error::AppError;
use crate::services::payments::CompletionOutcome;
use crate::AppState;

/// Start a payment for a listing or exchange offer. The response carries
/// the provider's hosted payment page URL, the ledger row and the fee
/// breakdown the amount was assembled from.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<InitiatePaymentResponse>), AppError> {
    payload.validate()?;

    let initiated = state
        .payments
        .initiate(payload.product_ref(), &payload.website_url)
        .await?;

    let fees = initiated.transaction.fees.clone();
    Ok((
        StatusCode::CREATED,
        Json(InitiatePaymentResponse {
            transaction: initiated.transaction.into(),
            payment_url: initiated.payment_url,
            fees,
        }),
    ))
}

/// Provider redirect target. Always answers with a browser redirect to the
/// frontend; reason codes are fixed and provider detail stays in the logs.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AppError> {
    let outcome = state.payments.complete(params.pidx.as_deref()).await?;

    let frontend = &state.config.server.frontend_url;
    let target = match outcome {
        CompletionOutcome::Completed { transaction_id }
        | CompletionOutcome::AlreadyCompleted { transaction_id } => {
            format!(
                "{}/payment-success?purchase_order_id={}",
                frontend, transaction_id
            )
        }
        CompletionOutcome::Failed(reason) => {
            format!("{}/payment-failed?reason={}", frontend, reason.as_str())
        }
    };

    Ok(Redirect::to(&target))
}
