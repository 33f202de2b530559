pub mod bids;
pub mod events;
pub mod khalti;
pub mod metrics;
pub mod payments;
pub mod sweeper;

pub use bids::BidProcessor;
pub use events::{EventBus, ServerEvent};
pub use khalti::KhaltiClient;
pub use payments::{CompletionOutcome, FailureReason, PaymentService};
