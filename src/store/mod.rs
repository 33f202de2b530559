//! Persistence seam for the marketplace.
//!
//! Every component talks to storage through [`MarketStore`] so the same
//! bidding and payment logic runs against MongoDB in production and an
//! in-memory backend in tests and local development.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::models::{
    ChatMessage, Conversation, ExchangeOffer, Listing, OfferStatus, PaymentTransaction, ProductRef,
};
use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::DateTime;
use uuid::Uuid;

#[async_trait]
pub trait MarketStore: Send + Sync {
    // Listings
    async fn insert_listing(&self, listing: Listing) -> Result<()>;
    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>>;
    async fn list_listings(&self) -> Result<Vec<Listing>>;

    /// Atomically accept a bid: the write succeeds only if `amount` still
    /// exceeds the stored `current_bid` (and meets `min_bid`) at write time.
    /// Returns `false` when the condition no longer holds, which is how the
    /// loser of a concurrent bid race is told apart instead of being
    /// silently overwritten.
    async fn apply_bid(&self, id: Uuid, amount: f64, bidder_email: &str) -> Result<bool>;

    /// Record when an initiated payment for this product goes overdue.
    async fn set_payment_expiry(&self, product: &ProductRef, expires_at: DateTime) -> Result<()>;

    /// Apply the product-side effects of a completed payment. For an
    /// exchange offer this also marks the offer accepted.
    async fn mark_paid(&self, product: &ProductRef, payment_id: Uuid, paid_at: DateTime)
        -> Result<()>;

    // Exchange offers
    async fn insert_offer(&self, offer: ExchangeOffer) -> Result<()>;
    async fn get_offer(&self, id: Uuid) -> Result<Option<ExchangeOffer>>;
    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<ExchangeOffer>>;

    /// Transition an offer out of `Pending`. Returns `false` if the offer
    /// was already decided.
    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> Result<bool>;

    // Payment ledger
    async fn insert_transaction(&self, transaction: PaymentTransaction) -> Result<()>;
    async fn get_transaction(&self, id: Uuid) -> Result<Option<PaymentTransaction>>;
    async fn get_transaction_by_pidx(&self, pidx: &str) -> Result<Option<PaymentTransaction>>;

    /// Transition a ledger row `Pending` → `Completed`, storing the raw
    /// provider payload. Conditional: returns `false` if the row was not
    /// pending, so a row completes at most once.
    async fn complete_transaction(
        &self,
        id: Uuid,
        details: serde_json::Value,
        completed_at: DateTime,
    ) -> Result<bool>;

    /// All completed ledger rows, for reconciliation.
    async fn completed_transactions(&self) -> Result<Vec<PaymentTransaction>>;

    /// Mark listings and offers with an elapsed `payment_expires_at` and a
    /// still-pending payment as failed. Returns how many were expired.
    async fn expire_overdue(&self, now: DateTime) -> Result<u64>;

    // Chat
    async fn insert_conversation(&self, conversation: Conversation) -> Result<()>;
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>>;
    async fn conversations_for(&self, participant: &str) -> Result<Vec<Conversation>>;
    async fn insert_message(&self, message: ChatMessage) -> Result<()>;
    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>>;
}
