mod chat;
mod listing;
mod offer;
mod payment;

pub use chat::{ChatMessage, Conversation};
pub use listing::{Listing, PaymentStatus};
pub use offer::{ExchangeOffer, OfferStatus, OfferedBook};
pub use payment::{FeeBreakdown, PaymentTransaction, ProductRef, TransactionStatus};
