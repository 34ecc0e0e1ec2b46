//! Request and Response DTOs for the Web API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Alert, TrackedWallet, WalletCluster};
use crate::smart_money::{DiscoveryReport, SweepStats};

// ============================================================================
// Health & Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub gateway_configured: bool,
    pub notification_channel: String,
    pub monitor_running: bool,
    pub discovery_running: bool,
    pub tracked_wallets: usize,
    pub alerts: usize,
    pub poll_interval_secs: u64,
    pub configured_tokens: usize,
    pub top_candidates: usize,
    pub last_sweep: Option<SweepStats>,
    pub last_discovery: Option<DiscoveryReport>,
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverRequest {
    /// Overrides the configured token source when non-empty
    #[serde(default)]
    pub mints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub success: bool,
    pub report: DiscoveryReport,
}

// ============================================================================
// Wallets
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddWalletRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub success: bool,
    /// False when the wallet was already tracked
    pub created: bool,
    pub wallet: TrackedWallet,
}

#[derive(Debug, Serialize)]
pub struct WalletsListResponse {
    pub success: bool,
    pub wallets: Vec<TrackedWallet>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RemoveWalletResponse {
    pub success: bool,
    pub address: String,
    pub remaining: usize,
}

// ============================================================================
// Alerts & Clusters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AlertsListResponse {
    pub success: bool,
    pub alerts: Vec<Alert>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ClustersResponse {
    pub success: bool,
    pub clusters: Vec<WalletCluster>,
}

// ============================================================================
// Monitor Control
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MonitorResponse {
    pub success: bool,
    pub running: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub stats: SweepStats,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub details: Option<String>,
}
