//! Bid processing.
//!
//! Acceptance is a single conditional write at the storage layer, so when
//! two bids race for the same listing exactly one wins and the other gets
//! an invalid-bid error instead of silently losing its update.

use crate::error::AppError;
use crate::services::events::{EventBus, ServerEvent};
use crate::services::metrics;
use crate::store::MarketStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BidAccepted {
    pub listing_id: Uuid,
    pub current_bid: f64,
    pub bidder_email: String,
}

#[derive(Clone)]
pub struct BidProcessor {
    store: Arc<dyn MarketStore>,
    events: EventBus,
}

impl BidProcessor {
    pub fn new(store: Arc<dyn MarketStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Validate and apply a bid, then broadcast the new price.
    ///
    /// Auction `end_time` is intentionally not checked here: close time is
    /// a display concern and late bids are accepted.
    pub async fn place_bid(
        &self,
        listing_id: Uuid,
        amount: f64,
        bidder_email: &str,
    ) -> Result<BidAccepted, AppError> {
        let listing = self
            .store
            .get_listing(listing_id)
            .await
            .map_err(AppError::DatabaseError)?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Listing not found")))?;

        if amount < listing.min_bid {
            metrics::record_bid("rejected");
            return Err(AppError::InvalidBid(format!(
                "Bid of {} is below the minimum bid of {}",
                amount, listing.min_bid
            )));
        }
        if amount <= listing.current_bid {
            metrics::record_bid("rejected");
            return Err(AppError::InvalidBid(format!(
                "Bid of {} does not exceed the current bid of {}",
                amount, listing.current_bid
            )));
        }

        let accepted = self
            .store
            .apply_bid(listing_id, amount, bidder_email)
            .await
            .map_err(AppError::DatabaseError)?;

        if !accepted {
            // Lost a race: someone else moved current_bid between our read
            // and the conditional write.
            metrics::record_bid("rejected");
            let current = self
                .store
                .get_listing(listing_id)
                .await
                .map_err(AppError::DatabaseError)?
                .map(|l| l.current_bid)
                .unwrap_or(listing.current_bid);
            return Err(AppError::InvalidBid(format!(
                "Bid of {} does not exceed the current bid of {}",
                amount, current
            )));
        }

        tracing::info!(
            listing_id = %listing_id,
            amount = amount,
            bidder = %bidder_email,
            "Bid accepted"
        );
        metrics::record_bid("accepted");

        self.events.publish(ServerEvent::NewBid {
            listing_id,
            current_bid: amount,
            bidder_email: bidder_email.to_string(),
        });

        Ok(BidAccepted {
            listing_id,
            current_bid: amount,
            bidder_email: bidder_email.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Listing, PaymentStatus};
    use crate::store::MemoryStore;
    use mongodb::bson::DateTime;

    fn listing_with_min_bid(min_bid: f64) -> Listing {
        let now = DateTime::now();
        Listing {
            id: Uuid::new_v4(),
            title: "The Name of the Wind".to_string(),
            author: "Patrick Rothfuss".to_string(),
            description: None,
            condition: Some("good".to_string()),
            seller_email: "seller@example.com".to_string(),
            min_bid,
            current_bid: 0.0,
            bidder_email: None,
            end_time: now,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_date: None,
            payment_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn processor(store: &MemoryStore) -> BidProcessor {
        BidProcessor::new(Arc::new(store.clone()), EventBus::new(8))
    }

    #[tokio::test]
    async fn bid_sequence_against_min_bid_floor() {
        let store = MemoryStore::new();
        let listing = listing_with_min_bid(100.0);
        let id = listing.id;
        store.insert_listing(listing).await.unwrap();
        let bids = processor(&store);

        // Below the floor
        let err = bids.place_bid(id, 80.0, "a@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidBid(_)));
        assert_eq!(store.get_listing(id).await.unwrap().unwrap().current_bid, 0.0);

        // Accepted
        let accepted = bids.place_bid(id, 150.0, "a@example.com").await.unwrap();
        assert_eq!(accepted.current_bid, 150.0);

        // Does not exceed the new current bid
        let err = bids.place_bid(id, 120.0, "b@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidBid(_)));

        let stored = store.get_listing(id).await.unwrap().unwrap();
        assert_eq!(stored.current_bid, 150.0);
        assert_eq!(stored.bidder_email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn equal_bid_is_rejected() {
        let store = MemoryStore::new();
        let listing = listing_with_min_bid(100.0);
        let id = listing.id;
        store.insert_listing(listing).await.unwrap();
        let bids = processor(&store);

        bids.place_bid(id, 150.0, "a@example.com").await.unwrap();
        let err = bids.place_bid(id, 150.0, "b@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidBid(_)));
    }

    #[tokio::test]
    async fn concurrent_equal_bids_exactly_one_wins() {
        let store = MemoryStore::new();
        let listing = listing_with_min_bid(100.0);
        let id = listing.id;
        store.insert_listing(listing).await.unwrap();
        let bids = processor(&store);

        let b1 = bids.clone();
        let b2 = bids.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { b1.place_bid(id, 150.0, "a@example.com").await }),
            tokio::spawn(async move { b2.place_bid(id, 150.0, "b@example.com").await }),
        );
        let results = [r1.unwrap(), r2.unwrap()];

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one of two equal bids must win");
        let stored = store.get_listing(id).await.unwrap().unwrap();
        assert_eq!(stored.current_bid, 150.0);
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let store = MemoryStore::new();
        let bids = processor(&store);
        let err = bids
            .place_bid(Uuid::new_v4(), 100.0, "a@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn accepted_bid_is_broadcast() {
        let store = MemoryStore::new();
        let listing = listing_with_min_bid(100.0);
        let id = listing.id;
        store.insert_listing(listing).await.unwrap();

        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let bids = BidProcessor::new(Arc::new(store), bus);

        bids.place_bid(id, 150.0, "a@example.com").await.unwrap();

        match rx.recv().await.unwrap() {
            ServerEvent::NewBid {
                listing_id,
                current_bid,
                bidder_email,
            } => {
                assert_eq!(listing_id, id);
                assert_eq!(current_bid, 150.0);
                assert_eq!(bidder_email, "a@example.com");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
