use crate::models::{
    ChatMessage, Conversation, ExchangeOffer, FeeBreakdown, Listing, OfferStatus, OfferedBook,
    PaymentStatus, PaymentTransaction, ProductRef, TransactionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Listings

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    #[validate(email)]
    pub seller_email: String,
    #[validate(range(min = 0.0))]
    pub min_bid: f64,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub seller_email: String,
    pub min_bid: f64,
    pub current_bid: f64,
    pub bidder_email: Option<String>,
    pub end_time: String,
    pub payment_status: PaymentStatus,
    pub created_at: String,
}

impl From<Listing> for ListingResponse {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            title: l.title,
            author: l.author,
            description: l.description,
            condition: l.condition,
            seller_email: l.seller_email,
            min_bid: l.min_bid,
            current_bid: l.current_bid,
            bidder_email: l.bidder_email,
            end_time: l.end_time.to_string(),
            payment_status: l.payment_status,
            created_at: l.created_at.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceBidRequest {
    #[validate(range(min = 0.01))]
    pub bid_amount: f64,
    #[validate(email)]
    pub bidder_email: String,
}

#[derive(Debug, Serialize)]
pub struct BidResponse {
    pub current_bid: f64,
    pub bidder_email: String,
}

// Exchange offers

#[derive(Debug, Deserialize, Validate)]
pub struct OfferedBookRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    pub condition: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfferRequest {
    pub listing_id: Uuid,
    #[validate(email)]
    pub offerer_email: String,
    #[validate(nested)]
    pub offered_book: OfferedBookRequest,
}

impl From<OfferedBookRequest> for OfferedBook {
    fn from(b: OfferedBookRequest) -> Self {
        Self {
            title: b.title,
            author: b.author,
            condition: b.condition,
            description: b.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferAction {
    Accept,
    Decline,
}

#[derive(Debug, Deserialize)]
pub struct RespondOfferRequest {
    pub action: OfferAction,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub offerer_email: String,
    pub offered_book: OfferedBook,
    pub offer_status: OfferStatus,
    pub payment_status: PaymentStatus,
    pub created_at: String,
}

impl From<ExchangeOffer> for OfferResponse {
    fn from(o: ExchangeOffer) -> Self {
        Self {
            id: o.id,
            listing_id: o.listing_id,
            offerer_email: o.offerer_email,
            offered_book: o.offered_book,
            offer_status: o.offer_status,
            payment_status: o.payment_status,
            created_at: o.created_at.to_string(),
        }
    }
}

// Payments

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum ProductType {
    Listing,
    ExchangeOffer,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    pub product_id: Uuid,
    pub product_type: ProductType,
    #[validate(url)]
    pub website_url: String,
}

impl InitiatePaymentRequest {
    pub fn product_ref(&self) -> ProductRef {
        match self.product_type {
            ProductType::Listing => ProductRef::Listing(self.product_id),
            ProductType::ExchangeOffer => ProductRef::ExchangeOffer(self.product_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub pidx: String,
    #[serde(flatten)]
    pub product: ProductRef,
    pub amount: f64,
    pub status: TransactionStatus,
    pub created_at: String,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(t: PaymentTransaction) -> Self {
        Self {
            id: t.id,
            pidx: t.pidx,
            product: t.product,
            amount: t.amount,
            status: t.status,
            created_at: t.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub transaction: TransactionResponse,
    pub payment_url: String,
    pub fees: FeeBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub pidx: Option<String>,
}

// Chat

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(length(min = 2))]
    pub participants: Vec<String>,
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participants: Vec<String>,
    pub listing_id: Option<Uuid>,
    pub created_at: String,
    pub last_message_at: String,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            participants: c.participants,
            listing_id: c.listing_id,
            created_at: c.created_at.to_string(),
            last_message_at: c.last_message_at.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(email)]
    pub sender_email: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_email: String,
    pub body: String,
    pub sent_at: String,
}

impl From<ChatMessage> for MessageResponse {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_email: m.sender_email,
            body: m.body,
            sent_at: m.sent_at.to_string(),
        }
    }
}
