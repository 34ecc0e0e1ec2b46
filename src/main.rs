use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod bot;
mod config;
mod error;
mod models;
mod smart_money;
mod storage;
mod web;

use crate::api::birdeye::BirdeyeClient;
use crate::api::helius::HeliusClient;
use crate::api::{ChainDataGateway, LiveGateway};
use crate::config::Config;
use crate::storage::TrackingStore;
use crate::web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::load());
    info!("Configuration loaded successfully");

    // Chain data clients
    let helius = match &config.helius_api_key {
        Some(key) => Some(HeliusClient::new(&config.helius_rpc_url, key).context("Failed to build Helius client")?),
        None => {
            warn!("HELIUS_API_KEY not set, discovery and monitoring are unavailable");
            None
        }
    };
    let birdeye = match &config.birdeye_api_key {
        Some(key) => Some(BirdeyeClient::new(key).context("Failed to build Birdeye client")?),
        None => {
            warn!("BIRDEYE_API_KEY not set, market data and token search are disabled");
            None
        }
    };
    let gateway: Arc<dyn ChainDataGateway> = Arc::new(LiveGateway::new(helius, birdeye, &config.rate_limits()));
    info!("Chain data gateway initialized");

    let store = Arc::new(TrackingStore::open(&config.database_path).context("Failed to open tracking store")?);
    info!("📂 {} wallets tracked, {} alerts stored", store.tracked_count(), store.alert_count());

    let notifier = bot::build_notifier(&config);
    let state = AppState::new(config.clone(), store.clone(), gateway.clone(), notifier);

    // Resume monitoring of wallets tracked before a restart
    if gateway.is_configured() && store.tracked_count() > 0 {
        if let Err(e) = state.monitor.ensure_running().await {
            warn!("Failed to resume wallet monitor: {}", e);
        }
    }

    info!("Starting smart money tracker...");
    let result = web::server::start_server(state).await;

    store.flush().await?;
    result
}
