//! MongoDB-backed [`MarketStore`].

use super::MarketStore;
use crate::models::{
    ChatMessage, Conversation, ExchangeOffer, Listing, OfferStatus, PaymentStatus,
    PaymentTransaction, ProductRef, TransactionStatus,
};
use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use uuid::Uuid;

#[derive(Clone)]
pub struct MongoStore {
    listings: Collection<Listing>,
    offers: Collection<ExchangeOffer>,
    transactions: Collection<PaymentTransaction>,
    conversations: Collection<Conversation>,
    messages: Collection<ChatMessage>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            listings: db.collection("listings"),
            offers: db.collection("exchange_offers"),
            transactions: db.collection("transactions"),
            conversations: db.collection("conversations"),
            messages: db.collection("messages"),
        }
    }

    /// Initialize database indexes.
    pub async fn init_indexes(&self) -> Result<()> {
        let pidx_index = IndexModel::builder()
            .keys(doc! { "pidx": 1 })
            .options(
                IndexOptions::builder()
                    .name("transaction_pidx_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("transaction_status_idx".to_string())
                    .build(),
            )
            .build();

        self.transactions
            .create_indexes([pidx_index, status_index], None)
            .await?;

        let expiry_index = IndexModel::builder()
            .keys(doc! { "payment_status": 1, "payment_expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("listing_payment_expiry_idx".to_string())
                    .build(),
            )
            .build();
        self.listings.create_indexes([expiry_index], None).await?;

        let offer_expiry_index = IndexModel::builder()
            .keys(doc! { "payment_status": 1, "payment_expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("offer_payment_expiry_idx".to_string())
                    .build(),
            )
            .build();
        self.offers
            .create_indexes([offer_expiry_index], None)
            .await?;

        let participant_index = IndexModel::builder()
            .keys(doc! { "participants": 1 })
            .options(
                IndexOptions::builder()
                    .name("conversation_participant_idx".to_string())
                    .build(),
            )
            .build();
        self.conversations
            .create_indexes([participant_index], None)
            .await?;

        let message_index = IndexModel::builder()
            .keys(doc! { "conversation_id": 1, "sent_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("message_conversation_idx".to_string())
                    .build(),
            )
            .build();
        self.messages.create_indexes([message_index], None).await?;

        tracing::info!("Marketplace indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl MarketStore for MongoStore {
    async fn insert_listing(&self, listing: Listing) -> Result<()> {
        self.listings.insert_one(listing, None).await?;
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        let listing = self
            .listings
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(listing)
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self.listings.find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn apply_bid(&self, id: Uuid, amount: f64, bidder_email: &str) -> Result<bool> {
        // Single conditional write: losers of a concurrent race match
        // nothing and are reported back instead of overwriting.
        let filter = doc! {
            "_id": id.to_string(),
            "current_bid": { "$lt": amount },
            "min_bid": { "$lte": amount },
        };
        let update = doc! {
            "$set": {
                "current_bid": amount,
                "bidder_email": bidder_email,
                "updated_at": DateTime::now(),
            }
        };
        let result = self.listings.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn set_payment_expiry(&self, product: &ProductRef, expires_at: DateTime) -> Result<()> {
        let update = doc! {
            "$set": {
                "payment_expires_at": expires_at,
                "updated_at": DateTime::now(),
            }
        };
        match product {
            ProductRef::Listing(id) => {
                self.listings
                    .update_one(doc! { "_id": id.to_string() }, update, None)
                    .await?;
            }
            ProductRef::ExchangeOffer(id) => {
                self.offers
                    .update_one(doc! { "_id": id.to_string() }, update, None)
                    .await?;
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
        match product {
            ProductRef::Listing(id) => {
                let update = doc! {
                    "$set": {
                        "payment_status": to_bson(&PaymentStatus::Paid)?,
                        "payment_id": payment_id.to_string(),
                        "payment_date": paid_at,
                        "updated_at": DateTime::now(),
                    }
                };
                self.listings
                    .update_one(doc! { "_id": id.to_string() }, update, None)
                    .await?;
            }
            ProductRef::ExchangeOffer(id) => {
                let update = doc! {
                    "$set": {
                        "offer_status": to_bson(&OfferStatus::Accepted)?,
                        "payment_status": to_bson(&PaymentStatus::Paid)?,
                        "payment_id": payment_id.to_string(),
                        "payment_date": paid_at,
                        "updated_at": DateTime::now(),
                    }
                };
                self.offers
                    .update_one(doc! { "_id": id.to_string() }, update, None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn insert_offer(&self, offer: ExchangeOffer) -> Result<()> {
        self.offers.insert_one(offer, None).await?;
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<ExchangeOffer>> {
        let offer = self
            .offers
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(offer)
    }

    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<ExchangeOffer>> {
        let cursor = self
            .offers
            .find(doc! { "listing_id": listing_id.to_string() }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> Result<bool> {
        let filter = doc! {
            "_id": id.to_string(),
            "offer_status": to_bson(&OfferStatus::Pending)?,
        };
        let update = doc! {
            "$set": {
                "offer_status": to_bson(&status)?,
                "updated_at": DateTime::now(),
            }
        };
        let result = self.offers.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_transaction(&self, transaction: PaymentTransaction) -> Result<()> {
        self.transactions.insert_one(transaction, None).await?;
        Ok(())
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<PaymentTransaction>> {
        let transaction = self
            .transactions
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(transaction)
    }

    async fn get_transaction_by_pidx(&self, pidx: &str) -> Result<Option<PaymentTransaction>> {
        let transaction = self
            .transactions
            .find_one(doc! { "pidx": pidx }, None)
            .await?;
        Ok(transaction)
    }

    async fn complete_transaction(
        &self,
        id: Uuid,
        details: serde_json::Value,
        completed_at: DateTime,
    ) -> Result<bool> {
        let filter = doc! {
            "_id": id.to_string(),
            "status": to_bson(&TransactionStatus::Pending)?,
        };
        let update = doc! {
            "$set": {
                "status": to_bson(&TransactionStatus::Completed)?,
                "transaction_details": to_bson(&details)?,
                "updated_at": completed_at,
            }
        };
        let result = self.transactions.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn completed_transactions(&self) -> Result<Vec<PaymentTransaction>> {
        let cursor = self
            .transactions
            .find(
                doc! { "status": to_bson(&TransactionStatus::Completed)? },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn expire_overdue(&self, now: DateTime) -> Result<u64> {
        let filter = doc! {
            "payment_status": to_bson(&PaymentStatus::Pending)?,
            "payment_expires_at": { "$lt": now },
        };
        let update = doc! {
            "$set": {
                "payment_status": to_bson(&PaymentStatus::Failed)?,
                "updated_at": DateTime::now(),
            }
        };

        let listings = self
            .listings
            .update_many(filter.clone(), update.clone(), None)
            .await?;
        let offers = self.offers.update_many(filter, update, None).await?;

        Ok(listings.modified_count + offers.modified_count)
    }

    async fn insert_conversation(&self, conversation: Conversation) -> Result<()> {
        self.conversations.insert_one(conversation, None).await?;
        Ok(())
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        let conversation = self
            .conversations
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(conversation)
    }

    async fn conversations_for(&self, participant: &str) -> Result<Vec<Conversation>> {
        let options = FindOptions::builder()
            .sort(doc! { "last_message_at": -1 })
            .build();
        let cursor = self
            .conversations
            .find(doc! { "participants": participant }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_message(&self, message: ChatMessage) -> Result<()> {
        let conversation_id = message.conversation_id;
        let sent_at = message.sent_at;
        self.messages.insert_one(message, None).await?;
        self.conversations
            .update_one(
                doc! { "_id": conversation_id.to_string() },
                doc! { "$set": { "last_message_at": sent_at } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>> {
        let options = FindOptions::builder().sort(doc! { "sent_at": 1 }).build();
        let cursor = self
            .messages
            .find(
                doc! { "conversation_id": conversation_id.to_string() },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
