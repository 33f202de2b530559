//! Scheduled maintenance over payment state.
//!
//! Two passes run on the same schedule: expiring overdue pending payments,
//! and reconciling completed ledger rows whose product-side write never
//! landed (the completion handler's two writes are not transactional, so
//! the mismatch is detected and repaired here).

use crate::models::{PaymentStatus, ProductRef};
use crate::store::MarketStore;
use anyhow::Result;
use mongodb::bson::DateTime;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending payments moved to failed because their window elapsed.
    pub expired: u64,
    /// Completed ledger rows whose product was still unpaid and got
    /// repaired.
    pub repaired: u64,
}

/// Run one expiry + reconciliation pass.
pub async fn run_sweep(store: &dyn MarketStore) -> Result<SweepReport> {
    let now = DateTime::now();
    let expired = store.expire_overdue(now).await?;

    // Only pending or expired products are eligible for repair: a refunded
    // product must not be flipped back to paid.
    fn repairable(status: PaymentStatus) -> bool {
        matches!(status, PaymentStatus::Pending | PaymentStatus::Failed)
    }

    let mut repaired = 0;
    for transaction in store.completed_transactions().await? {
        let unpaid = match transaction.product {
            ProductRef::Listing(id) => store
                .get_listing(id)
                .await?
                .is_some_and(|l| repairable(l.payment_status)),
            ProductRef::ExchangeOffer(id) => store
                .get_offer(id)
                .await?
                .is_some_and(|o| repairable(o.payment_status)),
        };

        if unpaid {
            tracing::warn!(
                transaction_id = %transaction.id,
                "Completed ledger row with unpaid product, repairing"
            );
            store
                .mark_paid(&transaction.product, transaction.id, transaction.updated_at)
                .await?;
            repaired += 1;
        }
    }

    if expired > 0 || repaired > 0 {
        tracing::info!(expired, repaired, "Payment sweep finished");
    }
    Ok(SweepReport { expired, repaired })
}

/// Register the sweep on a cron schedule and start the scheduler.
pub async fn schedule(store: Arc<dyn MarketStore>, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_id, _scheduler| {
        let store = store.clone();
        Box::pin(async move {
            if let Err(e) = run_sweep(store.as_ref()).await {
                tracing::error!(error = %e, "Payment sweep failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(cron = %cron, "Payment sweep scheduled");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FeeBreakdown, Listing, PaymentTransaction, TransactionStatus,
    };
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn listing(payment_expires_at: Option<DateTime>) -> Listing {
        let now = DateTime::now();
        Listing {
            id: Uuid::new_v4(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: None,
            condition: None,
            seller_email: "seller@example.com".to_string(),
            min_bid: 100.0,
            current_bid: 150.0,
            bidder_email: Some("buyer@example.com".to_string()),
            end_time: now,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_date: None,
            payment_expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    fn hours_from_now(hours: i64) -> DateTime {
        DateTime::from_millis(DateTime::now().timestamp_millis() + hours * 60 * 60 * 1000)
    }

    #[tokio::test]
    async fn sweep_expires_only_overdue_pending_payments() {
        let store = MemoryStore::new();

        let overdue = listing(Some(hours_from_now(-1)));
        let overdue_id = overdue.id;
        let future = listing(Some(hours_from_now(1)));
        let future_id = future.id;
        store.insert_listing(overdue).await.unwrap();
        store.insert_listing(future).await.unwrap();

        let report = run_sweep(&store).await.unwrap();
        assert_eq!(report.expired, 1);

        let overdue = store.get_listing(overdue_id).await.unwrap().unwrap();
        assert_eq!(overdue.payment_status, PaymentStatus::Failed);
        let future = store.get_listing(future_id).await.unwrap().unwrap();
        assert_eq!(future.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn sweep_repairs_completed_ledger_with_unpaid_listing() {
        let store = MemoryStore::new();

        let listing = listing(None);
        let listing_id = listing.id;
        store.insert_listing(listing).await.unwrap();

        let now = DateTime::now();
        let transaction = PaymentTransaction {
            id: Uuid::new_v4(),
            pidx: "sweep-test-pidx".to_string(),
            product: ProductRef::Listing(listing_id),
            amount: 180.0,
            fees: FeeBreakdown {
                base_amount: 150.0,
                processing_fee: 5.0,
                delivery_fee: 25.0,
            },
            status: TransactionStatus::Completed,
            transaction_details: None,
            website_url: "http://localhost:3000".to_string(),
            created_at: now,
            updated_at: now,
        };
        let transaction_id = transaction.id;
        store.insert_transaction(transaction).await.unwrap();

        let report = run_sweep(&store).await.unwrap();
        assert_eq!(report.repaired, 1);

        let listing = store.get_listing(listing_id).await.unwrap().unwrap();
        assert_eq!(listing.payment_status, PaymentStatus::Paid);
        assert_eq!(listing.payment_id, Some(transaction_id));

        // A second pass finds nothing left to repair.
        let report = run_sweep(&store).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn sweep_leaves_refunded_products_alone() {
        let store = MemoryStore::new();

        let mut listing = listing(None);
        listing.payment_status = PaymentStatus::Refunded;
        let listing_id = listing.id;
        store.insert_listing(listing).await.unwrap();

        let now = DateTime::now();
        store
            .insert_transaction(PaymentTransaction {
                id: Uuid::new_v4(),
                pidx: "refund-test-pidx".to_string(),
                product: ProductRef::Listing(listing_id),
                amount: 180.0,
                fees: FeeBreakdown {
                    base_amount: 150.0,
                    processing_fee: 5.0,
                    delivery_fee: 25.0,
                },
                status: TransactionStatus::Completed,
                transaction_details: None,
                website_url: "http://localhost:3000".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let report = run_sweep(&store).await.unwrap();
        assert_eq!(report.repaired, 0);

        let listing = store.get_listing(listing_id).await.unwrap().unwrap();
        assert_eq!(listing.payment_status, PaymentStatus::Refunded);
    }
}
