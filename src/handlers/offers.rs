//! Exchange offer handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateOfferRequest, OfferAction, OfferResponse, RespondOfferRequest};
use crate::error::AppError;
use crate::models::{ExchangeOffer, OfferStatus, PaymentStatus};
use crate::AppState;

/// Propose a swap against a listing.
pub async fn create_offer(
    State(state): State<AppState>,
    Json(payload): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<OfferResponse>), AppError> {
    payload.validate()?;

    // The listing must exist before anyone can offer against it.
    state
        .store
        .get_listing(payload.listing_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Listing not found")))?;

    let now = DateTime::now();
    let offer = ExchangeOffer {
        id: Uuid::new_v4(),
        listing_id: payload.listing_id,
        offerer_email: payload.offerer_email,
        offered_book: payload.offered_book.into(),
        offer_status: OfferStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_id: None,
        payment_date: None,
        payment_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .insert_offer(offer.clone())
        .await
        .map_err(AppError::DatabaseError)?;

    tracing::info!(
        offer_id = %offer.id,
        listing_id = %offer.listing_id,
        "Exchange offer created"
    );

    Ok((StatusCode::CREATED, Json(offer.into())))
}

pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferResponse>, AppError> {
    let offer = state
        .store
        .get_offer(id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Exchange offer not found")))?;

    Ok(Json(offer.into()))
}

pub async fn offers_for_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<Vec<OfferResponse>>, AppError> {
    let offers = state
        .store
        .offers_for_listing(listing_id)
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(offers.into_iter().map(Into::into).collect()))
}

/// Listing owner's accept/decline decision. An offer leaves `pending`
/// exactly once; a second decision is a conflict.
pub async fn respond_to_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondOfferRequest>,
) -> Result<Json<OfferResponse>, AppError> {
    let status = match payload.action {
        OfferAction::Accept => OfferStatus::Accepted,
        OfferAction::Decline => OfferStatus::Declined,
    };

    let transitioned = state
        .store
        .set_offer_status(id, status)
        .await
        .map_err(AppError::DatabaseError)?;

    if !transitioned {
        // Distinguish a missing offer from an already-decided one.
        return match state
            .store
            .get_offer(id)
            .await
            .map_err(AppError::DatabaseError)?
        {
            Some(_) => Err(AppError::Conflict(anyhow::anyhow!(
                "Exchange offer was already decided"
            ))),
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "Exchange offer not found"
            ))),
        };
    }

    let offer = state
        .store
        .get_offer(id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Exchange offer not found")))?;

    tracing::info!(offer_id = %id, status = ?offer.offer_status, "Exchange offer decided");

    Ok(Json(offer.into()))
}
