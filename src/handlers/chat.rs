//! Conversation and message handlers. Posting a message also fans it out
//! on the broadcast channel.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    ConversationResponse, CreateConversationRequest, MessageResponse, PostMessageRequest,
};
use crate::error::AppError;
use crate::models::{ChatMessage, Conversation};
use crate::services::events::ServerEvent;
use crate::AppState;

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    payload.validate()?;

    let now = DateTime::now();
    let conversation = Conversation {
        id: Uuid::new_v4(),
        participants: payload.participants,
        listing_id: payload.listing_id,
        created_at: now,
        last_message_at: now,
    };

    state
        .store
        .insert_conversation(conversation.clone())
        .await
        .map_err(AppError::DatabaseError)?;

    Ok((StatusCode::CREATED, Json(conversation.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListConversationsParams {
    pub participant: String,
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListConversationsParams>,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let conversations = state
        .store
        .conversations_for(&params.participant)
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload.validate()?;

    let conversation = state
        .store
        .get_conversation(conversation_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Conversation not found")))?;

    if !conversation
        .participants
        .iter()
        .any(|p| p == &payload.sender_email)
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Sender is not part of this conversation"
        )));
    }

    let message = ChatMessage {
        id: Uuid::new_v4(),
        conversation_id,
        sender_email: payload.sender_email,
        body: payload.body,
        sent_at: DateTime::now(),
    };

    state
        .store
        .insert_message(message.clone())
        .await
        .map_err(AppError::DatabaseError)?;

    state.events.publish(ServerEvent::ChatMessage {
        conversation_id,
        message_id: message.id,
        sender_email: message.sender_email.clone(),
        body: message.body.clone(),
    });

    Ok((StatusCode::CREATED, Json(message.into())))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    state
        .store
        .get_conversation(conversation_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Conversation not found")))?;

    let messages = state
        .store
        .messages_for(conversation_id)
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
