//! Exchange offer model.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PaymentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
}

/// The book a user proposes to swap in.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OfferedBook {
    pub title: String,
    pub author: String,
    pub condition: Option<String>,
    pub description: Option<String>,
}

/// A proposal to swap a book for a listing, bypassing bidding.
///
/// Status transitions leave `Pending` exactly once: either by the listing
/// owner's decline, or by payment completion (which also marks it accepted).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExchangeOffer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub listing_id: Uuid,
    pub offerer_email: String,
    pub offered_book: OfferedBook,
    pub offer_status: OfferStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<Uuid>,
    pub payment_date: Option<DateTime>,
    pub payment_expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
