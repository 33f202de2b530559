//! Listing and bid handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{BidResponse, CreateListingRequest, ListingResponse, PlaceBidRequest};
use crate::error::AppError;
use crate::models::{Listing, PaymentStatus};
use crate::AppState;

/// Create a listing. A fresh listing always starts with `current_bid = 0`
/// and a pending payment status.
pub async fn create_listing(
    State(state): State<AppState>,
    Json(payload): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), AppError> {
    payload.validate()?;

    let now = DateTime::now();
    let listing = Listing {
        id: Uuid::new_v4(),
        title: payload.title,
        author: payload.author,
        description: payload.description,
        condition: payload.condition,
        seller_email: payload.seller_email,
        min_bid: payload.min_bid,
        current_bid: 0.0,
        bidder_email: None,
        end_time: DateTime::from_chrono(payload.end_time),
        payment_status: PaymentStatus::Pending,
        payment_id: None,
        payment_date: None,
        payment_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .insert_listing(listing.clone())
        .await
        .map_err(AppError::DatabaseError)?;

    tracing::info!(listing_id = %listing.id, title = %listing.title, "Listing created");

    Ok((StatusCode::CREATED, Json(listing.into())))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = state
        .store
        .get_listing(id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Listing not found")))?;

    Ok(Json(listing.into()))
}

pub async fn list_listings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    let listings = state
        .store
        .list_listings()
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(listings.into_iter().map(Into::into).collect()))
}

/// Submit a bid for a listing.
pub async fn place_bid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Json<BidResponse>, AppError> {
    payload.validate()?;

    let accepted = state
        .bids
        .place_bid(id, payload.bid_amount, &payload.bidder_email)
        .await?;

    Ok(Json(BidResponse {
        current_bid: accepted.current_bid,
        bidder_email: accepted.bidder_email,
    }))
}
