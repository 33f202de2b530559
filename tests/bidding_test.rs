mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
async fn fresh_listing_has_zero_bid_and_pending_payment() {
    let app = TestApp::spawn().await;
    let id = app.create_listing(100.0).await;

    let response = app.get(&format!("/listings/{}", id)).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["current_bid"], 0.0);
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["min_bid"], 100.0);
    assert!(body["bidder_email"].is_null());
}

#[tokio::test]
async fn bid_sequence_against_min_bid_floor() {
    let app = TestApp::spawn().await;
    let id = app.create_listing(100.0).await;
    let path = format!("/listings/{}/bids", id);

    // Below the floor: rejected, listing unchanged
    let response = app
        .post_json(
            &path,
            &json!({ "bid_amount": 80.0, "bidder_email": "a@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 409);

    let listing: Value = app
        .get(&format!("/listings/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["current_bid"], 0.0);
    assert!(listing["bidder_email"].is_null());

    // Above the floor: accepted
    let response = app
        .post_json(
            &path,
            &json!({ "bid_amount": 150.0, "bidder_email": "a@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["current_bid"], 150.0);
    assert_eq!(body["bidder_email"], "a@example.com");

    // Does not exceed the current bid: rejected
    let response = app
        .post_json(
            &path,
            &json!({ "bid_amount": 120.0, "bidder_email": "b@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 409);

    let listing: Value = app
        .get(&format!("/listings/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["current_bid"], 150.0);
    assert_eq!(listing["bidder_email"], "a@example.com");
}

#[tokio::test]
async fn sequential_increasing_bids_leave_the_higher_one() {
    let app = TestApp::spawn().await;
    let id = app.create_listing(100.0).await;
    let path = format!("/listings/{}/bids", id);

    for (amount, bidder) in [(120.0, "first@example.com"), (180.0, "second@example.com")] {
        let response = app
            .post_json(
                &path,
                &json!({ "bid_amount": amount, "bidder_email": bidder }),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let listing: Value = app
        .get(&format!("/listings/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["current_bid"], 180.0);
    assert_eq!(listing["bidder_email"], "second@example.com");
}

#[tokio::test]
async fn malformed_bidder_email_fails_validation() {
    let app = TestApp::spawn().await;
    let id = app.create_listing(100.0).await;

    let response = app
        .post_json(
            &format!("/listings/{}/bids", id),
            &json!({ "bid_amount": 150.0, "bidder_email": "not-an-email" }),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn bid_on_unknown_listing_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            &format!("/listings/{}/bids", uuid::Uuid::new_v4()),
            &json!({ "bid_amount": 150.0, "bidder_email": "a@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 404);
}

/// Auction close is a display concern only: the server accepts bids after
/// `end_time`. This pins down the permissive behavior on purpose.
#[tokio::test]
async fn bid_after_end_time_is_accepted() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/listings",
            &json!({
                "title": "Past Auction",
                "author": "Anonymous",
                "seller_email": "seller@example.com",
                "min_bid": 100.0,
                "end_time": "2020-01-01T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let listing: Value = response.json().await.unwrap();
    let id = listing["id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/listings/{}/bids", id),
            &json!({ "bid_amount": 150.0, "bidder_email": "late@example.com" }),
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn replayed_equal_bid_is_rejected() {
    let app = TestApp::spawn().await;
    let id = app.create_listing(100.0).await;
    let path = format!("/listings/{}/bids", id);
    let bid = json!({ "bid_amount": 150.0, "bidder_email": "a@example.com" });

    let response = app.post_json(&path, &bid).await;
    assert_eq!(response.status(), 200);

    // The same amount again no longer exceeds the current bid.
    let response = app.post_json(&path, &bid).await;
    assert_eq!(response.status(), 409);
}
