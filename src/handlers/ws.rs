//! WebSocket endpoint for realtime updates.
//!
//! Clients subscribe to listing and conversation ids after connecting.
//! Bid updates go to subscribers of that listing, or to everyone when a
//! client never narrowed its subscription. Chat messages only go to
//! clients subscribed to that conversation. Delivery is at-most-once: a
//! client that disconnects misses events and re-fetches state on
//! reconnect.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::services::events::ServerEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Subscribe {
        #[serde(default)]
        listing_ids: Vec<Uuid>,
        #[serde(default)]
        conversation_ids: Vec<Uuid>,
    },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum OutboundMessage {
    Event { event: ServerEvent },
    #[serde(rename_all = "camelCase")]
    Subscribed {
        listing_ids: Vec<Uuid>,
        conversation_ids: Vec<Uuid>,
    },
    Pong,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    tracing::debug!(client_id = %client_id, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();

    // Subscription state is owned by this connection's task.
    let mut listing_ids: Vec<Uuid> = Vec::new();
    let mut conversation_ids: Vec<Uuid> = Vec::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!(client_id = %client_id, missed, "Client lagged behind broadcast");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let wanted = match &event {
                    ServerEvent::NewBid { listing_id, .. } => {
                        listing_ids.is_empty() || listing_ids.contains(listing_id)
                    }
                    ServerEvent::ChatMessage { conversation_id, .. } => {
                        conversation_ids.contains(conversation_id)
                    }
                };
                if !wanted {
                    continue;
                }

                let outbound = OutboundMessage::Event { event };
                if let Ok(text) = serde_json::to_string(&outbound) {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            }
            incoming = receiver.next() => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    _ => break,
                };
                match msg {
                    Message::Text(text) => {
                        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
                            continue;
                        };
                        let reply = match client_msg {
                            ClientMessage::Subscribe {
                                listing_ids: listings,
                                conversation_ids: conversations,
                            } => {
                                listing_ids = listings.clone();
                                conversation_ids = conversations.clone();
                                OutboundMessage::Subscribed {
                                    listing_ids: listings,
                                    conversation_ids: conversations,
                                }
                            }
                            ClientMessage::Ping => OutboundMessage::Pong,
                        };
                        if let Ok(text) = serde_json::to_string(&reply) {
                            if sender.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!(client_id = %client_id, "WebSocket client disconnected");
}
