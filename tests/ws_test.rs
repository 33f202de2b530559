mod common;

use common::TestApp;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(app: &TestApp) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/ws", app.port);
    let (stream, _) = connect_async(url).await.expect("WebSocket connect failed");
    stream
}

async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a WebSocket message")
            .expect("WebSocket closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("Invalid JSON frame");
        }
    }
}

#[tokio::test]
async fn ping_pong() {
    let app = TestApp::spawn().await;
    let mut ws = connect(&app).await;

    ws.send(Message::Text(json!({ "type": "ping" }).to_string()))
        .await
        .unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "pong");
}

#[tokio::test]
async fn subscribed_client_receives_bid_updates() {
    let app = TestApp::spawn().await;
    let listing_id = app.create_listing(100.0).await;

    let mut ws = connect(&app).await;
    ws.send(Message::Text(
        json!({ "type": "subscribe", "listingIds": [listing_id] }).to_string(),
    ))
    .await
    .unwrap();

    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["listingIds"][0], listing_id);

    let response = app
        .post_json(
            &format!("/listings/{}/bids", listing_id),
            &json!({ "bid_amount": 150.0, "bidder_email": "buyer@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["event"]["type"], "newBid");
    assert_eq!(event["event"]["listingId"], listing_id);
    assert_eq!(event["event"]["currentBid"], 150.0);
    assert_eq!(event["event"]["bidderEmail"], "buyer@example.com");
}

#[tokio::test]
async fn unrelated_listing_updates_are_filtered_out() {
    let app = TestApp::spawn().await;
    let watched = app.create_listing(100.0).await;
    let other = app.create_listing(100.0).await;

    let mut ws = connect(&app).await;
    ws.send(Message::Text(
        json!({ "type": "subscribe", "listingIds": [watched] }).to_string(),
    ))
    .await
    .unwrap();
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "subscribed");

    let response = app
        .post_json(
            &format!("/listings/{}/bids", other),
            &json!({ "bid_amount": 150.0, "bidder_email": "buyer@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    // Nothing should arrive for the unwatched listing.
    let nothing = timeout(Duration::from_millis(500), ws.next()).await;
    assert!(nothing.is_err(), "expected no event for unwatched listing");
}

#[tokio::test]
async fn chat_messages_reach_conversation_subscribers() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/conversations",
            &json!({ "participants": ["alice@example.com", "bob@example.com"] }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let conversation: Value = response.json().await.unwrap();
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    let mut ws = connect(&app).await;
    ws.send(Message::Text(
        json!({ "type": "subscribe", "conversationIds": [conversation_id] }).to_string(),
    ))
    .await
    .unwrap();
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "subscribed");

    let response = app
        .post_json(
            &format!("/conversations/{}/messages", conversation_id),
            &json!({ "sender_email": "alice@example.com", "body": "Still for sale?" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let event = next_json(&mut ws).await;
    assert_eq!(event["event"]["type"], "chatMessage");
    assert_eq!(event["event"]["conversationId"], conversation_id.as_str());
    assert_eq!(event["event"]["body"], "Still for sale?");
}
