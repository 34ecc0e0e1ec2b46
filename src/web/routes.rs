//! API route definitions

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use super::AppState;

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Health & status
        .route("/api/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))

        // Discovery
        .route("/api/discover", post(handlers::trigger_discovery))

        // Tracked wallets
        .route("/api/wallets", get(handlers::list_wallets))
        .route("/api/wallets", post(handlers::add_wallet))
        .route("/api/wallets/:address", delete(handlers::remove_wallet))

        // Alerts & clusters
        .route("/api/alerts", get(handlers::list_alerts))
        .route("/api/clusters", get(handlers::list_clusters))

        // Monitor control
        .route("/api/monitor/start", post(handlers::start_monitor))
        .route("/api/monitor/stop", post(handlers::stop_monitor))
        .route("/api/monitor/clear", post(handlers::clear_monitor))
        .route("/api/monitor/sweep", post(handlers::sweep_monitor))

        // Add state to all routes
        .with_state(state)
}
