//! Khalti payment provider client.
//!
//! Implements Khalti's ePayment API for payment initiation and post-redirect
//! lookup. Amounts cross this boundary in paisa (the minor currency unit);
//! the caller converts exactly once, at initiation.

use crate::config::KhaltiConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Khalti client for interacting with the ePayment API.
#[derive(Clone)]
pub struct KhaltiClient {
    client: Client,
    config: KhaltiConfig,
}

/// Request to initiate a payment session.
#[derive(Debug, Serialize)]
pub struct InitiateRequest {
    /// Where Khalti redirects the buyer after the attempt.
    pub return_url: String,
    /// The merchant site, shown on the payment page.
    pub website_url: String,
    /// Amount in paisa.
    pub amount: u64,
    pub purchase_order_id: String,
    pub purchase_order_name: String,
}

/// Provider session descriptor returned by initiation.
#[derive(Debug, Deserialize)]
pub struct KhaltiSession {
    /// Provider-assigned payment index.
    pub pidx: String,
    /// Hosted payment page to redirect the buyer to.
    pub payment_url: String,
    pub expires_at: Option<String>,
}

/// Payment lookup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupResponse {
    pub pidx: String,
    /// Amount in paisa as the provider recorded it.
    pub total_amount: u64,
    /// Provider-reported state, e.g. "Completed", "Pending", "Expired",
    /// "User canceled".
    pub status: String,
    pub transaction_id: Option<String>,
    pub fee: Option<u64>,
    pub refunded: Option<bool>,
}

impl LookupResponse {
    pub fn is_completed(&self) -> bool {
        self.status == "Completed"
    }
}

impl KhaltiClient {
    pub fn new(config: KhaltiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Khalti is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Create a payment session on the provider side.
    ///
    /// Non-2xx responses and transport failures are propagated, not
    /// retried.
    pub async fn initiate(&self, request: &InitiateRequest) -> Result<KhaltiSession> {
        if !self.is_configured() {
            return Err(anyhow!("Khalti credentials not configured"));
        }

        let url = format!("{}/epayment/initiate/", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Key {}", self.config.secret_key.expose_secret()),
            )
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Khalti initiate response");

        if status.is_success() {
            let session: KhaltiSession = serde_json::from_str(&body)?;
            tracing::info!(
                pidx = %session.pidx,
                amount = request.amount,
                purchase_order_id = %request.purchase_order_id,
                "Khalti payment session created"
            );
            Ok(session)
        } else {
            tracing::error!(status = %status, body = %body, "Khalti initiation failed");
            Err(anyhow!("Khalti error ({}): {}", status, body))
        }
    }

    /// Look up the state of a payment session by its `pidx`.
    pub async fn lookup(&self, pidx: &str) -> Result<LookupResponse> {
        if !self.is_configured() {
            return Err(anyhow!("Khalti credentials not configured"));
        }

        let url = format!("{}/epayment/lookup/", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Key {}", self.config.secret_key.expose_secret()),
            )
            .json(&serde_json::json!({ "pidx": pidx }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Khalti lookup response");

        if status.is_success() {
            let lookup: LookupResponse = serde_json::from_str(&body)?;
            Ok(lookup)
        } else {
            tracing::error!(status = %status, body = %body, "Khalti lookup failed");
            Err(anyhow!("Khalti lookup error ({}): {}", status, body))
        }
    }
}
