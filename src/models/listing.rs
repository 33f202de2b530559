//! Book listing model.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle of a listing or exchange offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// A book up for auction-style bidding.
///
/// `current_bid` starts at 0 and only moves upward through the bid
/// processor's conditional write. `min_bid` is set at creation and never
/// changes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub seller_email: String,
    pub min_bid: f64,
    pub current_bid: f64,
    pub bidder_email: Option<String>,
    /// Auction close time. Display concern only; bids are not rejected
    /// server-side after this point.
    pub end_time: DateTime,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<Uuid>,
    pub payment_date: Option<DateTime>,
    pub payment_expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Listing {
    /// Amount a buyer pays for this listing before surcharges.
    pub fn base_price(&self) -> f64 {
        if self.current_bid > 0.0 {
            self.current_bid
        } else {
            self.min_bid
        }
    }
}
