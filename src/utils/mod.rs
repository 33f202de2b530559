//! Fee schedule and currency helpers.

use crate::models::FeeBreakdown;

/// Flat surcharge applied to every listing purchase, in rupees.
pub const PROCESSING_FEE: f64 = 5.0;
/// Delivery surcharge applied to every purchase, in rupees.
pub const DELIVERY_FEE: f64 = 25.0;
/// Flat fee charged for a book exchange instead of a sale price.
pub const EXCHANGE_FEE: f64 = 100.0;

/// Fees for buying a listing outright: winning bid plus surcharges.
pub fn listing_fees(base_amount: f64) -> FeeBreakdown {
    FeeBreakdown {
        base_amount,
        processing_fee: PROCESSING_FEE,
        delivery_fee: DELIVERY_FEE,
    }
}

/// Fees for an accepted exchange: flat exchange fee plus delivery.
pub fn exchange_fees() -> FeeBreakdown {
    FeeBreakdown {
        base_amount: EXCHANGE_FEE,
        processing_fee: 0.0,
        delivery_fee: DELIVERY_FEE,
    }
}

/// Convert rupees to the provider's minor unit (paisa). Performed exactly
/// once, at payment initiation.
pub fn to_minor_units(amount: f64) -> u64 {
    (amount * 100.0).round() as u64
}
