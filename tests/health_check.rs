mod common;

use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Invalid health response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tradeabook-service");
}

#[tokio::test]
async fn metrics_endpoint_responds() {
    let app = TestApp::spawn().await;

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), 200);
}
