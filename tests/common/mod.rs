use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tradeabook_service::config::{
    Config, DatabaseConfig, KhaltiConfig, ServerConfig, SweepConfig,
};
use tradeabook_service::store::MemoryStore;
use tradeabook_service::Application;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: MemoryStore,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        // Tests that never reach the gateway still get a syntactically
        // valid (but unreachable) base URL.
        Self::spawn_with_gateway("http://127.0.0.1:9").await
    }

    pub async fn spawn_with_gateway(gateway_base_url: &str) -> Self {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
                public_url: "http://localhost:0".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: Secret::new("mongodb://localhost:27017".to_string()),
                db_name: "tradeabook_test".to_string(),
            },
            khalti: KhaltiConfig {
                secret_key: Secret::new("test_secret_key".to_string()),
                api_base_url: gateway_base_url.to_string(),
                payment_expiry_hours: 24,
            },
            sweep: SweepConfig {
                enabled: false,
                cron: "0 0 0 * * *".to_string(),
            },
            service_name: "tradeabook-service-test".to_string(),
        };

        let store = MemoryStore::new();
        let app = Application::build_with_store(config, Arc::new(store.clone()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Redirects stay observable: payment callbacks answer with one.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test client");

        // Wait for the server to be ready by polling the health endpoint
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
        }
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Create a listing and return its id.
    pub async fn create_listing(&self, min_bid: f64) -> String {
        let response = self
            .post_json(
                "/listings",
                &json!({
                    "title": "The Hobbit",
                    "author": "J.R.R. Tolkien",
                    "condition": "good",
                    "seller_email": "seller@example.com",
                    "min_bid": min_bid,
                    "end_time": "2030-01-01T00:00:00Z",
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Invalid listing response");
        body["id"].as_str().expect("Missing listing id").to_string()
    }
}
