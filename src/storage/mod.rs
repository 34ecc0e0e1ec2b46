//! Tracking Store
//!
//! Durable mapping of watched wallets and emitted alerts on an embedded sled database.
//! Rows are JSON encoded. Wallet rows are keyed by address, so there is exactly one
//! row per address and every write replaces the whole row.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::models::{Alert, TrackedWallet};

const WALLETS_TREE: &str = "tracked_wallets";
const ALERTS_TREE: &str = "alerts";
const ALERT_INDEX_TREE: &str = "alert_index";

pub struct TrackingStore {
    db: sled::Db,
    /// address -> TrackedWallet
    wallets: sled::Tree,
    /// timestamp_ms (big endian) ++ signature -> Alert
    alerts: sled::Tree,
    /// wallet:signature -> alert key
    alert_index: sled::Tree,
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| TrackerError::DatabaseError(format!("encode failed: {}", e)).into())
}

fn alert_key(alert: &Alert) -> Vec<u8> {
    let millis = alert.timestamp.timestamp_millis().max(0) as u64;
    let mut key = millis.to_be_bytes().to_vec();
    key.extend_from_slice(alert.signature.as_bytes());
    key
}

impl TrackingStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::DatabaseError(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let db = sled::open(path).map_err(TrackerError::from)?;
        info!("📂 Opened tracking store at {}", path.display());
        Self::from_db(db)
    }

    /// In-memory database removed on drop
    #[cfg(test)]
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(TrackerError::from)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            wallets: db.open_tree(WALLETS_TREE).map_err(TrackerError::from)?,
            alerts: db.open_tree(ALERTS_TREE).map_err(TrackerError::from)?,
            alert_index: db.open_tree(ALERT_INDEX_TREE).map_err(TrackerError::from)?,
            db,
        })
    }

    // ==========================================================================
    // Tracked wallets
    // ==========================================================================

    /// Insert or fully replace the row for `wallet.address`
    pub fn upsert_tracked_wallet(&self, wallet: &TrackedWallet) -> Result<()> {
        self.wallets
            .insert(wallet.address.as_bytes(), encode(wallet)?)
            .map_err(TrackerError::from)?;
        debug!("💾 Upserted tracked wallet {}", wallet.address);
        Ok(())
    }

    pub fn get_tracked_wallet(&self, address: &str) -> Result<Option<TrackedWallet>> {
        let Some(raw) = self.wallets.get(address.as_bytes()).map_err(TrackerError::from)? else {
            return Ok(None);
        };
        let wallet = serde_json::from_slice(&raw)
            .map_err(|e| TrackerError::DatabaseError(format!("corrupt row for {}: {}", address, e)))?;
        Ok(Some(wallet))
    }

    /// Returns true if a row was removed
    pub fn delete_tracked_wallet(&self, address: &str) -> Result<bool> {
        let removed = self
            .wallets
            .remove(address.as_bytes())
            .map_err(TrackerError::from)?
            .is_some();
        if removed {
            info!("🗑️ Untracked wallet {}", address);
        }
        Ok(removed)
    }

    /// All tracked wallets, oldest first
    pub fn list_tracked_wallets(&self) -> Result<Vec<TrackedWallet>> {
        let mut wallets = Vec::with_capacity(self.wallets.len());
        for entry in self.wallets.iter() {
            let (key, value) = entry.map_err(TrackerError::from)?;
            match serde_json::from_slice::<TrackedWallet>(&value) {
                Ok(wallet) => wallets.push(wallet),
                Err(e) => warn!("Skipping corrupt wallet row {}: {}", String::from_utf8_lossy(&key), e),
            }
        }
        wallets.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(wallets)
    }

    pub fn tracked_count(&self) -> usize {
        self.wallets.len()
    }

    /// Atomically rewrite the row for `address`.
    ///
    /// `merge` receives the current row (`None` when absent) and returns the row to
    /// store; returning `None` for an absent row leaves it absent. The merge runs
    /// inside a sled compare-and-swap loop and may be called more than once.
    pub fn update_tracked_wallet<F>(&self, address: &str, mut merge: F) -> Result<Option<TrackedWallet>>
    where
        F: FnMut(Option<TrackedWallet>) -> Option<TrackedWallet>,
    {
        let mut failure: Option<String> = None;
        let updated = self
            .wallets
            .update_and_fetch(address.as_bytes(), |old| {
                failure = None;
                let current = match old.map(|raw| serde_json::from_slice::<TrackedWallet>(raw)) {
                    None => None,
                    Some(Ok(wallet)) => Some(wallet),
                    Some(Err(e)) => {
                        failure = Some(format!("corrupt row for {}: {}", address, e));
                        return old.map(|raw| raw.to_vec());
                    }
                };
                match merge(current).map(|wallet| serde_json::to_vec(&wallet)) {
                    None => None,
                    Some(Ok(raw)) => Some(raw),
                    Some(Err(e)) => {
                        failure = Some(format!("encode failed for {}: {}", address, e));
                        old.map(|raw| raw.to_vec())
                    }
                }
            })
            .map_err(TrackerError::from)?;

        if let Some(message) = failure {
            return Err(TrackerError::DatabaseError(message).into());
        }
        let Some(raw) = updated else {
            return Ok(None);
        };
        let wallet = serde_json::from_slice(&raw)
            .map_err(|e| TrackerError::DatabaseError(format!("corrupt row for {}: {}", address, e)))?;
        Ok(Some(wallet))
    }

    /// Move the monitoring cursor of an existing row forward.
    ///
    /// Only the cursor and `last_trade_at` change, so metrics computed by discovery
    /// survive. Returns `None` when the wallet is no longer tracked.
    pub fn advance_cursor(
        &self,
        address: &str,
        signature: &str,
        block_time: Option<i64>,
    ) -> Result<Option<TrackedWallet>> {
        let updated = self.update_tracked_wallet(address, |current| {
            current.map(|mut wallet| {
                wallet.last_signature = Some(signature.to_string());
                if let Some(time) = block_time {
                    wallet.last_trade_at = Some(wallet.last_trade_at.map_or(time, |prev| prev.max(time)));
                }
                wallet
            })
        })?;

        if updated.is_none() {
            debug!("Cursor update skipped, {} no longer tracked", address);
        }
        Ok(updated)
    }

    // ==========================================================================
    // Alerts
    // ==========================================================================

    /// Append an alert. Returns false (and writes nothing) when an alert for the
    /// same (wallet, signature) already exists.
    pub fn append_alert(&self, alert: &Alert) -> Result<bool> {
        let index_key = format!("{}:{}", alert.wallet, alert.signature);
        let key = alert_key(alert);

        let claimed = self
            .alert_index
            .compare_and_swap(index_key.as_bytes(), None::<&[u8]>, Some(key.as_slice()))
            .map_err(TrackerError::from)?;

        if claimed.is_err() {
            debug!("Duplicate alert for {} ignored", index_key);
            return Ok(false);
        }

        self.alerts.insert(key, encode(alert)?).map_err(TrackerError::from)?;
        Ok(true)
    }

    /// Newest first
    pub fn list_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        for entry in self.alerts.iter().rev().take(limit) {
            let (_, value) = entry.map_err(TrackerError::from)?;
            match serde_json::from_slice::<Alert>(&value) {
                Ok(alert) => alerts.push(alert),
                Err(e) => warn!("Skipping corrupt alert row: {}", e),
            }
        }
        Ok(alerts)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    /// Remove every wallet and alert
    pub fn clear_all(&self) -> Result<()> {
        self.wallets.clear().map_err(TrackerError::from)?;
        self.alerts.clear().map_err(TrackerError::from)?;
        self.alert_index.clear().map_err(TrackerError::from)?;
        info!("🧹 Cleared tracking store");
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(TrackerError::from)?;
        Ok(())
    }
}
