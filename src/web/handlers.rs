//! Request handlers for all API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{error, info, warn};

use super::models::*;
use super::AppState;
use crate::error::TrackerError;
use crate::models::TrackedWallet;

const DEFAULT_ALERT_LIMIT: usize = 50;
const MAX_ALERT_LIMIT: usize = 500;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an error to a response, using the status implied by its [`TrackerError`] kind
fn api_error(context: &str, e: anyhow::Error) -> ApiError {
    let status = match e.downcast_ref::<TrackerError>() {
        Some(TrackerError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        Some(TrackerError::InvalidAddress(_)) => StatusCode::BAD_REQUEST,
        Some(TrackerError::NotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        error!("{}: {:#}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }

    (
        status,
        Json(ErrorResponse {
            success: false,
            error: context.to_string(),
            details: Some(e.to_string()),
        }),
    )
}

// ============================================================================
// Health & Status
// ============================================================================

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        gateway_configured: state.gateway.is_configured(),
        notification_channel: state.notifications.channel().to_string(),
        monitor_running: state.monitor.is_running().await,
        discovery_running: state.discovery.is_running(),
        tracked_wallets: state.store.tracked_count(),
        alerts: state.store.alert_count(),
        poll_interval_secs: state.monitor.config().poll_interval_secs,
        configured_tokens: state.discovery.config().token_mints.len(),
        top_candidates: state.discovery.config().top_candidates,
        last_sweep: state.monitor.last_sweep().await,
        last_discovery: state.discovery.last_report().await,
    })
}

// ============================================================================
// Discovery
// ============================================================================

pub async fn trigger_discovery(
    State(state): State<AppState>,
    body: Option<Json<DiscoverRequest>>,
) -> Result<Json<DiscoverResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mints = Some(request.mints).filter(|m| !m.is_empty());

    info!("Discovery triggered via API");
    let report = state
        .discovery
        .run(mints)
        .await
        .map_err(|e| api_error("Discovery failed", e))?;

    Ok(Json(DiscoverResponse { success: true, report }))
}

// ============================================================================
// Wallets
// ============================================================================

pub async fn list_wallets(State(state): State<AppState>) -> Result<Json<WalletsListResponse>, ApiError> {
    let wallets = state
        .store
        .list_tracked_wallets()
        .map_err(|e| api_error("Failed to list wallets", e))?;
    let total = wallets.len();

    Ok(Json(WalletsListResponse {
        success: true,
        wallets,
        total,
    }))
}

pub async fn add_wallet(
    State(state): State<AppState>,
    Json(request): Json<AddWalletRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let address = request.address.trim();
    if Pubkey::from_str(address).is_err() {
        return Err(api_error(
            "Invalid wallet address",
            TrackerError::InvalidAddress(address.to_string()).into(),
        ));
    }

    if let Some(wallet) = state
        .store
        .get_tracked_wallet(address)
        .map_err(|e| api_error("Failed to read wallet", e))?
    {
        return Ok(Json(WalletResponse {
            success: true,
            created: false,
            wallet,
        }));
    }

    let wallet = TrackedWallet::new_manual(address);
    state
        .store
        .upsert_tracked_wallet(&wallet)
        .map_err(|e| api_error("Failed to track wallet", e))?;
    info!("➕ Manually tracking wallet {}", address);

    if state.gateway.is_configured() {
        if let Err(e) = state.monitor.ensure_running().await {
            warn!("Wallet tracked but monitor not started: {}", e);
        }
    }

    Ok(Json(WalletResponse {
        success: true,
        created: true,
        wallet,
    }))
}

pub async fn remove_wallet(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RemoveWalletResponse>, ApiError> {
    let removed = state
        .store
        .delete_tracked_wallet(&address)
        .map_err(|e| api_error("Failed to untrack wallet", e))?;
    if !removed {
        return Err(api_error(
            "Wallet not tracked",
            TrackerError::NotFound(address).into(),
        ));
    }

    let remaining = state.store.tracked_count();
    if remaining == 0 {
        // Nothing left to watch
        if let Err(e) = state.monitor.stop().await {
            warn!("Wallet untracked but monitor not stopped: {}", e);
        }
    }

    Ok(Json(RemoveWalletResponse {
        success: true,
        address,
        remaining,
    }))
}

// ============================================================================
// Alerts & Clusters
// ============================================================================

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).min(MAX_ALERT_LIMIT);
    let alerts = state
        .store
        .list_recent_alerts(limit)
        .map_err(|e| api_error("Failed to list alerts", e))?;
    let total = alerts.len();

    Ok(Json(AlertsListResponse {
        success: true,
        alerts,
        total,
    }))
}

pub async fn list_clusters(State(state): State<AppState>) -> Json<ClustersResponse> {
    Json(ClustersResponse {
        success: true,
        clusters: state.discovery.clusters().await,
    })
}

// ============================================================================
// Monitor Control
// ============================================================================

pub async fn start_monitor(State(state): State<AppState>) -> Result<Json<MonitorResponse>, ApiError> {
    let started = state
        .monitor
        .ensure_running()
        .await
        .map_err(|e| api_error("Failed to start monitor", e))?;

    let message = if started {
        "Monitor started"
    } else {
        "Monitor already running"
    };
    Ok(Json(MonitorResponse {
        success: true,
        running: true,
        message: message.to_string(),
    }))
}

pub async fn stop_monitor(State(state): State<AppState>) -> Result<Json<MonitorResponse>, ApiError> {
    state
        .monitor
        .stop()
        .await
        .map_err(|e| api_error("Failed to stop monitor", e))?;

    Ok(Json(MonitorResponse {
        success: true,
        running: false,
        message: "Monitor stopped".to_string(),
    }))
}

/// Stop monitoring and forget every tracked wallet and alert
pub async fn clear_monitor(State(state): State<AppState>) -> Result<Json<MonitorResponse>, ApiError> {
    state
        .monitor
        .stop()
        .await
        .map_err(|e| api_error("Failed to stop monitor", e))?;
    state
        .store
        .clear_all()
        .map_err(|e| api_error("Failed to clear tracking data", e))?;

    Ok(Json(MonitorResponse {
        success: true,
        running: false,
        message: "Tracked wallets and alerts cleared".to_string(),
    }))
}

pub async fn sweep_monitor(State(state): State<AppState>) -> Result<Json<SweepResponse>, ApiError> {
    if !state.gateway.is_configured() {
        return Err(api_error(
            "Sweep failed",
            TrackerError::Unavailable("chain data gateway not configured".to_string()).into(),
        ));
    }

    let stats = state
        .monitor
        .sweep_now()
        .await
        .map_err(|e| api_error("Sweep failed", e))?;

    Ok(Json(SweepResponse { success: true, stats }))
}
