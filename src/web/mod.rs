//! Web API module
//!
//! REST surface for triggering discovery, managing tracked wallets, reading
//! alerts and clusters, and controlling the wallet monitor.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

use std::sync::Arc;

use crate::api::ChainDataGateway;
use crate::bot::notification::{NotificationManager, Notifier};
use crate::config::Config;
use crate::smart_money::{DiscoveryOrchestrator, WalletMonitor};
use crate::storage::TrackingStore;

/// Shared application state for all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Tracked wallets and alerts
    pub store: Arc<TrackingStore>,
    pub gateway: Arc<dyn ChainDataGateway>,
    pub notifications: Arc<NotificationManager>,
    pub monitor: Arc<WalletMonitor>,
    pub discovery: Arc<DiscoveryOrchestrator>,
}

impl AppState {
    /// Wire the monitor and the discovery orchestrator around shared collaborators
    pub fn new(
        config: Arc<Config>,
        store: Arc<TrackingStore>,
        gateway: Arc<dyn ChainDataGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let notifications = Arc::new(NotificationManager::new(notifier));

        let monitor = Arc::new(WalletMonitor::new(
            gateway.clone(),
            store.clone(),
            notifications.clone(),
            config.monitor_config(),
        ));

        let discovery = Arc::new(DiscoveryOrchestrator::new(
            gateway.clone(),
            store.clone(),
            monitor.clone(),
            notifications.clone(),
            config.discovery_config(),
        ));

        Self {
            config,
            store,
            gateway,
            notifications,
            monitor,
            discovery,
        }
    }
}
