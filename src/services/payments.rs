//! Payment initiation and completion.
//!
//! Initiation computes the charge once from the fee schedule, opens a
//! provider session and writes the ledger row. Completion is driven by the
//! provider's redirect callback and reconciles the lookup result with the
//! ledger before touching the purchased product.

use crate::config::KhaltiConfig;
use crate::error::AppError;
use crate::models::{PaymentTransaction, ProductRef, TransactionStatus};
use crate::services::khalti::{InitiateRequest, KhaltiClient};
use crate::services::metrics;
use crate::store::MarketStore;
use crate::utils::{exchange_fees, listing_fees, to_minor_units};
use mongodb::bson::DateTime;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed reason codes surfaced on the failure redirect. Provider error
/// detail stays in server-side logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MissingPidx,
    RecordNotFound,
    VerificationError,
    Refunded,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MissingPidx => "missing_pidx",
            FailureReason::RecordNotFound => "record_not_found",
            FailureReason::VerificationError => "verification_error",
            FailureReason::Refunded => "refunded",
        }
    }
}

/// Outcome of handling a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed { transaction_id: Uuid },
    /// Replay of an already-settled callback; nothing was mutated.
    AlreadyCompleted { transaction_id: Uuid },
    Failed(FailureReason),
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub transaction: PaymentTransaction,
    pub payment_url: String,
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MarketStore>,
    khalti: KhaltiClient,
    /// Callback endpoint handed to the provider at initiation.
    return_url: String,
    payment_expiry_hours: i64,
}

impl PaymentService {
    pub fn new(store: Arc<dyn MarketStore>, khalti: KhaltiClient, return_url: String, config: &KhaltiConfig) -> Self {
        Self {
            store,
            khalti,
            return_url,
            payment_expiry_hours: config.payment_expiry_hours,
        }
    }

    /// Open a provider session and create the ledger row for `product`.
    ///
    /// The amount is fixed here from the fee schedule and converted to
    /// minor units exactly once; completion never recomputes it.
    pub async fn initiate(
        &self,
        product: ProductRef,
        website_url: &str,
    ) -> Result<InitiatedPayment, AppError> {
        let (fees, order_name) = match &product {
            ProductRef::Listing(id) => {
                let listing = self
                    .store
                    .get_listing(*id)
                    .await
                    .map_err(AppError::DatabaseError)?
                    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Listing not found")))?;
                if listing.payment_status == crate::models::PaymentStatus::Paid {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Listing is already paid for"
                    )));
                }
                (listing_fees(listing.base_price()), listing.title)
            }
            ProductRef::ExchangeOffer(id) => {
                let offer = self
                    .store
                    .get_offer(*id)
                    .await
                    .map_err(AppError::DatabaseError)?
                    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Exchange offer not found")))?;
                if offer.payment_status == crate::models::PaymentStatus::Paid {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Exchange offer is already paid for"
                    )));
                }
                if offer.offer_status == crate::models::OfferStatus::Declined {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Exchange offer was declined"
                    )));
                }
                (
                    exchange_fees(),
                    format!("Exchange: {}", offer.offered_book.title),
                )
            }
        };

        let amount = fees.total();
        let amount_minor = to_minor_units(amount);
        let transaction_id = Uuid::new_v4();

        let session = self
            .khalti
            .initiate(&InitiateRequest {
                return_url: self.return_url.clone(),
                website_url: website_url.to_string(),
                amount: amount_minor,
                purchase_order_id: transaction_id.to_string(),
                purchase_order_name: order_name,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Payment initiation failed at the gateway");
                AppError::Gateway(e)
            })?;

        let now = DateTime::now();
        let transaction = PaymentTransaction {
            id: transaction_id,
            pidx: session.pidx.clone(),
            product,
            amount,
            fees,
            status: TransactionStatus::Pending,
            transaction_details: None,
            website_url: website_url.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_transaction(transaction.clone())
            .await
            .map_err(AppError::DatabaseError)?;

        let expires_at = DateTime::from_millis(
            now.timestamp_millis() + self.payment_expiry_hours * 60 * 60 * 1000,
        );
        self.store
            .set_payment_expiry(&transaction.product, expires_at)
            .await
            .map_err(AppError::DatabaseError)?;

        tracing::info!(
            transaction_id = %transaction.id,
            pidx = %transaction.pidx,
            amount = amount,
            "Payment initiated"
        );
        metrics::record_payment("initiated");
        metrics::record_payment_amount(amount_minor);

        Ok(InitiatedPayment {
            transaction,
            payment_url: session.payment_url,
        })
    }

    /// Reconcile a provider callback with the ledger.
    ///
    /// Straight-line state machine: missing pidx, lookup failure, unknown
    /// record and a non-Completed provider status all leave the ledger
    /// untouched. A replayed callback for a settled row is a no-op.
    pub async fn complete(&self, pidx: Option<&str>) -> Result<CompletionOutcome, AppError> {
        let pidx = match pidx {
            Some(p) if !p.is_empty() => p,
            _ => {
                tracing::warn!("Payment callback without pidx");
                return Ok(CompletionOutcome::Failed(FailureReason::MissingPidx));
            }
        };

        let lookup = match self.khalti.lookup(pidx).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::error!(pidx = %pidx, error = %e, "Payment lookup failed");
                metrics::record_payment("verification_error");
                return Ok(CompletionOutcome::Failed(FailureReason::VerificationError));
            }
        };

        let transaction = match self
            .store
            .get_transaction_by_pidx(pidx)
            .await
            .map_err(AppError::DatabaseError)?
        {
            Some(t) => t,
            None => {
                tracing::warn!(pidx = %pidx, "Callback for unknown payment");
                return Ok(CompletionOutcome::Failed(FailureReason::RecordNotFound));
            }
        };

        match transaction.status {
            TransactionStatus::Pending => {}
            TransactionStatus::Completed => {
                tracing::info!(
                    transaction_id = %transaction.id,
                    pidx = %pidx,
                    "Replayed callback for a settled transaction, nothing to do"
                );
                return Ok(CompletionOutcome::AlreadyCompleted {
                    transaction_id: transaction.id,
                });
            }
            TransactionStatus::Refunded => {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    pidx = %pidx,
                    "Callback for a refunded transaction"
                );
                return Ok(CompletionOutcome::Failed(FailureReason::Refunded));
            }
        }

        if !lookup.is_completed() {
            tracing::warn!(
                transaction_id = %transaction.id,
                pidx = %pidx,
                provider_status = %lookup.status,
                "Provider did not report the payment as completed"
            );
            metrics::record_payment("verification_error");
            return Ok(CompletionOutcome::Failed(FailureReason::VerificationError));
        }

        if lookup.total_amount != to_minor_units(transaction.amount) {
            tracing::warn!(
                transaction_id = %transaction.id,
                ledger_amount = transaction.amount,
                provider_amount = lookup.total_amount,
                "Provider amount differs from the ledger amount"
            );
        }

        let details = serde_json::to_value(&lookup)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        let now = DateTime::now();

        let transitioned = self
            .store
            .complete_transaction(transaction.id, details, now)
            .await
            .map_err(AppError::DatabaseError)?;
        if !transitioned {
            // A concurrent callback settled the row first.
            return Ok(CompletionOutcome::AlreadyCompleted {
                transaction_id: transaction.id,
            });
        }

        if let Err(e) = self
            .store
            .mark_paid(&transaction.product, transaction.id, now)
            .await
        {
            // Ledger says completed but the product write failed. The
            // reconciliation sweep detects and repairs this mismatch.
            tracing::error!(
                transaction_id = %transaction.id,
                error = %e,
                "Ledger completed but product update failed, awaiting reconciliation"
            );
        }

        tracing::info!(
            transaction_id = %transaction.id,
            pidx = %pidx,
            "Payment completed"
        );
        metrics::record_payment("completed");

        Ok(CompletionOutcome::Completed {
            transaction_id: transaction.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_codes_are_fixed() {
        assert_eq!(FailureReason::MissingPidx.as_str(), "missing_pidx");
        assert_eq!(FailureReason::RecordNotFound.as_str(), "record_not_found");
        assert_eq!(
            FailureReason::VerificationError.as_str(),
            "verification_error"
        );
        assert_eq!(FailureReason::Refunded.as_str(), "refunded");
    }
}
