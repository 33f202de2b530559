//! In-memory [`MarketStore`] for tests and local development.
//!
//! Mutations take the inner write lock, so the conditional semantics match
//! the MongoDB backend: a bid write checks its condition and applies it
//! under the same critical section.

use super::MarketStore;
use crate::models::{
    ChatMessage, Conversation, ExchangeOffer, Listing, OfferStatus, PaymentStatus,
    PaymentTransaction, ProductRef, TransactionStatus,
};
use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::DateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    listings: HashMap<Uuid, Listing>,
    offers: HashMap<Uuid, ExchangeOffer>,
    transactions: HashMap<Uuid, PaymentTransaction>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<ChatMessage>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_listing(&self, listing: Listing) -> Result<()> {
        self.inner.write().await.listings.insert(listing.id, listing);
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        Ok(self.inner.read().await.listings.get(&id).cloned())
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        let inner = self.inner.read().await;
        let mut listings: Vec<Listing> = inner.listings.values().cloned().collect();
        listings.sort_by_key(|l| std::cmp::Reverse(l.created_at));
        Ok(listings)
    }

    async fn apply_bid(&self, id: Uuid, amount: f64, bidder_email: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.listings.get_mut(&id) {
            Some(listing) if amount > listing.current_bid && amount >= listing.min_bid => {
                listing.current_bid = amount;
                listing.bidder_email = Some(bidder_email.to_string());
                listing.updated_at = DateTime::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_payment_expiry(&self, product: &ProductRef, expires_at: DateTime) -> Result<()> {
        let mut inner = self.inner.write().await;
        match product {
            ProductRef::Listing(id) => {
                if let Some(listing) = inner.listings.get_mut(id) {
                    listing.payment_expires_at = Some(expires_at);
                }
            }
            ProductRef::ExchangeOffer(id) => {
                if let Some(offer) = inner.offers.get_mut(id) {
                    offer.payment_expires_at = Some(expires_at);
                }
            }
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        product: &ProductRef,
        payment_id: Uuid,
        paid_at: DateTime,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        match product {
            ProductRef::Listing(id) => {
                if let Some(listing) = inner.listings.get_mut(id) {
                    listing.payment_status = PaymentStatus::Paid;
                    listing.payment_id = Some(payment_id);
                    listing.payment_date = Some(paid_at);
                    listing.updated_at = DateTime::now();
                }
            }
            ProductRef::ExchangeOffer(id) => {
                if let Some(offer) = inner.offers.get_mut(id) {
                    offer.offer_status = OfferStatus::Accepted;
                    offer.payment_status = PaymentStatus::Paid;
                    offer.payment_id = Some(payment_id);
                    offer.payment_date = Some(paid_at);
                    offer.updated_at = DateTime::now();
                }
            }
        }
        Ok(())
    }

    async fn insert_offer(&self, offer: ExchangeOffer) -> Result<()> {
        self.inner.write().await.offers.insert(offer.id, offer);
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<ExchangeOffer>> {
        Ok(self.inner.read().await.offers.get(&id).cloned())
    }

    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<ExchangeOffer>> {
        let inner = self.inner.read().await;
        Ok(inner
            .offers
            .values()
            .filter(|o| o.listing_id == listing_id)
            .cloned()
            .collect())
    }

    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.offers.get_mut(&id) {
            Some(offer) if offer.offer_status == OfferStatus::Pending => {
                offer.offer_status = status;
                offer.updated_at = DateTime::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_transaction(&self, transaction: PaymentTransaction) -> Result<()> {
        self.inner
            .write()
            .await
            .transactions
            .insert(transaction.id, transaction);
        Ok(())
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<PaymentTransaction>> {
        Ok(self.inner.read().await.transactions.get(&id).cloned())
    }

    async fn get_transaction_by_pidx(&self, pidx: &str) -> Result<Option<PaymentTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .values()
            .find(|t| t.pidx == pidx)
            .cloned())
    }

    async fn complete_transaction(
        &self,
        id: Uuid,
        details: serde_json::Value,
        completed_at: DateTime,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.transactions.get_mut(&id) {
            Some(tx) if tx.status == TransactionStatus::Pending => {
                tx.status = TransactionStatus::Completed;
                tx.transaction_details = Some(details);
                tx.updated_at = completed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn completed_transactions(&self) -> Result<Vec<PaymentTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Completed)
            .cloned()
            .collect())
    }

    async fn expire_overdue(&self, now: DateTime) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut expired = 0;

        for listing in inner.listings.values_mut() {
            if listing.payment_status == PaymentStatus::Pending
                && listing.payment_expires_at.is_some_and(|at| at < now)
            {
                listing.payment_status = PaymentStatus::Failed;
                listing.updated_at = DateTime::now();
                expired += 1;
            }
        }
        for offer in inner.offers.values_mut() {
            if offer.payment_status == PaymentStatus::Pending
                && offer.payment_expires_at.is_some_and(|at| at < now)
            {
                offer.payment_status = PaymentStatus::Failed;
                offer.updated_at = DateTime::now();
                expired += 1;
            }
        }

        Ok(expired)
    }

    async fn insert_conversation(&self, conversation: Conversation) -> Result<()> {
        self.inner
            .write()
            .await
            .conversations
            .insert(conversation.id, conversation);
        Ok(())
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn conversations_for(&self, participant: &str) -> Result<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.participants.iter().any(|p| p == participant))
            .cloned()
            .collect();
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_message_at));
        Ok(conversations)
    }

    async fn insert_message(&self, message: ChatMessage) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(conversation) = inner.conversations.get_mut(&message.conversation_id) {
            conversation.last_message_at = message.sent_at;
        }
        inner.messages.push(message);
        Ok(())
    }

    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }
}
