//! Payment transaction (ledger) model.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a ledger row. Transitions `Pending` → `Completed` at most
/// once; the store enforces this with a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refunded,
}

/// What a payment is for. The discriminator is serialized explicitly so the
/// completion handler's branch is exhaustively checked at compile time
/// instead of dispatching on a loose string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "product_model", content = "product_id")]
pub enum ProductRef {
    Listing(Uuid),
    ExchangeOffer(Uuid),
}

impl ProductRef {
    pub fn product_id(&self) -> Uuid {
        match self {
            ProductRef::Listing(id) | ProductRef::ExchangeOffer(id) => *id,
        }
    }
}

/// How a charged amount was assembled at initiation time. Persisted so the
/// amount is never recomputed at verification time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub base_amount: f64,
    pub processing_fee: f64,
    pub delivery_fee: f64,
}

impl FeeBreakdown {
    pub fn total(&self) -> f64 {
        self.base_amount + self.processing_fee + self.delivery_fee
    }
}

/// One payment attempt's lifecycle.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Provider-assigned payment index, set at initiation.
    pub pidx: String,
    #[serde(flatten)]
    pub product: ProductRef,
    /// Total charged in rupees, fixed at initiation.
    pub amount: f64,
    pub fees: FeeBreakdown,
    pub status: TransactionStatus,
    /// Raw provider lookup payload, stored verbatim for audit.
    pub transaction_details: Option<serde_json::Value>,
    /// Buyer-facing site captured at initiation, echoed to the provider.
    pub website_url: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
