use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub khalti: KhaltiConfig,
    pub sweep: SweepConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL of this service, handed to the payment
    /// provider as the callback target.
    pub public_url: String,
    /// Base URL of the browser frontend, used for payment redirects.
    pub frontend_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct KhaltiConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    /// Hours before an initiated-but-unpaid payment is considered overdue.
    pub payment_expiry_hours: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SweepConfig {
    pub enabled: bool,
    /// 6-field cron expression, defaults to midnight daily.
    pub cron: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("TRADEABOOK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("TRADEABOOK_PORT")
            .unwrap_or_else(|_| "3010".to_string())
            .parse()?;
        let public_url = env::var("TRADEABOOK_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let frontend_url = env::var("TRADEABOOK_FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let db_url = env::var("TRADEABOOK_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name =
            env::var("TRADEABOOK_DATABASE_NAME").unwrap_or_else(|_| "tradeabook".to_string());

        let khalti_secret = env::var("KHALTI_SECRET_KEY").unwrap_or_default();
        let khalti_base = env::var("KHALTI_API_BASE_URL")
            .unwrap_or_else(|_| "https://a.khalti.com/api/v2".to_string());
        let payment_expiry_hours = env::var("TRADEABOOK_PAYMENT_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()?;

        let sweep_enabled = env::var("TRADEABOOK_SWEEP_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let sweep_cron =
            env::var("TRADEABOOK_SWEEP_CRON").unwrap_or_else(|_| "0 0 0 * * *".to_string());

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                public_url,
                frontend_url,
            },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            khalti: KhaltiConfig {
                secret_key: Secret::new(khalti_secret),
                api_base_url: khalti_base,
                payment_expiry_hours,
            },
            sweep: SweepConfig {
                enabled: sweep_enabled,
                cron: sweep_cron,
            },
            service_name: "tradeabook-service".to_string(),
        })
    }
}
