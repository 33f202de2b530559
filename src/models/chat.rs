//! Conversation and message models. Chat is independent of the auction
//! flow; it only shares the broadcast channel.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub participants: Vec<String>,
    /// Listing the conversation started from, if any.
    pub listing_id: Option<Uuid>,
    pub created_at: DateTime,
    pub last_message_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_email: String,
    pub body: String,
    pub sent_at: DateTime,
}
