//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{sweeper, BidProcessor, EventBus, KhaltiClient, PaymentService};
use crate::store::{MarketStore, MongoStore};
use axum::{
    routing::{get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn MarketStore>,
    pub events: EventBus,
    pub bids: BidProcessor,
    pub payments: PaymentService,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against MongoDB.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some("tradeabook-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let store = MongoStore::new(&db);
        store.init_indexes().await?;

        Self::build_with_store(config, Arc::new(store)).await
    }

    /// Build the application over any [`MarketStore`]. Tests run against
    /// the in-memory backend through this entry point.
    pub async fn build_with_store(
        config: Config,
        store: Arc<dyn MarketStore>,
    ) -> anyhow::Result<Self> {
        let khalti = KhaltiClient::new(config.khalti.clone());
        if khalti.is_configured() {
            tracing::info!("Khalti client initialized");
        } else {
            tracing::warn!("Khalti credentials not configured - payment features will be limited");
        }

        let events = EventBus::default();
        let bids = BidProcessor::new(store.clone(), events.clone());
        let return_url = format!("{}/payments/callback", config.server.public_url);
        let payments = PaymentService::new(store.clone(), khalti, return_url, &config.khalti);

        let state = AppState {
            config: config.clone(),
            store,
            events,
            bids,
            payments,
        };

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("tradeabook-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            // Listings and bids
            .route(
                "/listings",
                get(handlers::listings::list_listings).post(handlers::listings::create_listing),
            )
            .route("/listings/:id", get(handlers::listings::get_listing))
            .route("/listings/:id/bids", post(handlers::listings::place_bid))
            .route(
                "/listings/:id/offers",
                get(handlers::offers::offers_for_listing),
            )
            // Exchange offers
            .route("/offers", post(handlers::offers::create_offer))
            .route(
                "/offers/:id",
                get(handlers::offers::get_offer),
            )
            .route("/offers/:id/response", patch(handlers::offers::respond_to_offer))
            // Payments
            .route("/payments/initiate", post(handlers::payments::initiate_payment))
            .route("/payments/callback", get(handlers::payments::payment_callback))
            // Chat
            .route(
                "/conversations",
                get(handlers::chat::list_conversations).post(handlers::chat::create_conversation),
            )
            .route(
                "/conversations/:id/messages",
                get(handlers::chat::list_messages).post(handlers::chat::post_message),
            )
            // Realtime
            .route("/ws", get(handlers::ws::ws_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let mut _scheduler = None;
        if self.state.config.sweep.enabled {
            let scheduler =
                sweeper::schedule(self.state.store.clone(), &self.state.config.sweep.cron).await?;
            _scheduler = Some(scheduler);
        }

        let router = Self::router(self.state);
        axum::serve(self.listener, router).await?;

        Ok(())
    }
}
