// src/smart_money/monitor.rs
//
// Incremental monitor for tracked wallets. Each wallet carries a cursor (the
// last signature seen); a poll only looks at the newest signature and acts when
// it differs from the cursor. The first poll of a wallet only sets the cursor.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use crate::api::rate_limit::RateLimiter;
use crate::api::{ChainDataGateway, Fetched};
use crate::bot::notification::{short_address, NotificationManager};
use crate::error::TrackerError;
use crate::models::{Alert, TrackedWallet};
use crate::storage::TrackingStore;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MonitorConfig {
    /// Seconds between sweeps
    pub poll_interval_secs: u64,
    /// Pacing between wallets within a sweep
    pub wallet_check_delay_ms: u64,
    /// SOL that must leave the wallet for a buy to alert
    pub min_buy_sol: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            wallet_check_delay_ms: 1000,
            min_buy_sol: 0.01,
        }
    }
}

// ============================================================================
// POLL RESULTS
// ============================================================================

/// What one poll of one wallet did
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The wallet has no signatures yet
    NoFeed,
    /// The signature feed could not be fetched; cursor untouched
    FeedUnavailable,
    /// First observation: cursor set, nothing alerted
    Baseline(String),
    /// Newest signature equals the cursor
    Unchanged,
    /// Cursor advanced without an alert
    Advanced(String),
    /// Cursor advanced and a buy alert was recorded
    Alerted(Alert),
    /// The wallet was untracked while the poll was in flight
    Untracked,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStats {
    pub wallets_checked: usize,
    pub baselines: usize,
    pub new_signatures: usize,
    pub alerts: usize,
    pub failures: usize,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SweepStats {
    fn tally(&mut self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Baseline(_) => self.baselines += 1,
            PollOutcome::Advanced(_) => self.new_signatures += 1,
            PollOutcome::Alerted(_) => {
                self.new_signatures += 1;
                self.alerts += 1;
            }
            PollOutcome::FeedUnavailable => self.failures += 1,
            PollOutcome::NoFeed | PollOutcome::Unchanged | PollOutcome::Untracked => {}
        }
    }
}

// ============================================================================
// MONITOR CORE
// ============================================================================

/// Polling logic shared between the API surface and the background task
struct MonitorCore {
    gateway: Arc<dyn ChainDataGateway>,
    store: Arc<TrackingStore>,
    notifications: Arc<NotificationManager>,
    config: MonitorConfig,
    pacer: RateLimiter,
    last_sweep: RwLock<Option<SweepStats>>,
}

impl MonitorCore {
    async fn poll_wallet(&self, wallet: &TrackedWallet) -> Result<PollOutcome> {
        let address = wallet.address.as_str();

        let latest = match self.gateway.fetch_signatures(address, 1).await {
            Fetched::Data(signatures) => match signatures.into_iter().next() {
                Some(latest) => latest,
                None => return Ok(PollOutcome::NoFeed),
            },
            Fetched::Empty => return Ok(PollOutcome::NoFeed),
            Fetched::Failed(_) => return Ok(PollOutcome::FeedUnavailable),
        };
        let signature = latest.signature;

        let Some(cursor) = wallet.last_signature.as_deref() else {
            return Ok(match self.store.advance_cursor(address, &signature, None)? {
                Some(_) => {
                    debug!("Baseline for {} set at {}", address, signature);
                    PollOutcome::Baseline(signature)
                }
                None => PollOutcome::Untracked,
            });
        };

        if cursor == signature {
            return Ok(PollOutcome::Unchanged);
        }

        let tx = self.gateway.fetch_transaction(&signature).await.into_option();
        let trade = tx.as_ref().filter(|tx| !tx.failed && tx.is_swap());

        // The cursor moves before anything else so a signature is handled at most once.
        let trade_time = trade.and_then(|tx| tx.block_time);
        let Some(current) = self.store.advance_cursor(address, &signature, trade_time)? else {
            return Ok(PollOutcome::Untracked);
        };

        let Some(tx) = trade else {
            return Ok(PollOutcome::Advanced(signature));
        };
        let Some(mint) = tx.bought_mint() else {
            return Ok(PollOutcome::Advanced(signature));
        };

        let spent = -tx.primary_delta_sol();
        if spent <= self.config.min_buy_sol {
            debug!("{} bought {} for {:.4} SOL, below alert threshold", address, mint, spent);
            return Ok(PollOutcome::Advanced(signature));
        }

        let symbol = match self.gateway.fetch_token_market_data(mint).await {
            Fetched::Data(data) => data.symbol.filter(|s| !s.is_empty()),
            _ => None,
        }
        .unwrap_or_else(|| short_address(mint));

        let alert = Alert::new_buy(address, mint, &symbol, spent, &signature);
        if !self.store.append_alert(&alert)? {
            return Ok(PollOutcome::Advanced(signature));
        }

        info!("🟢 {} bought {} for {:.4} SOL", short_address(address), symbol, spent);
        self.notifications.send_buy_alert(&alert, &current).await;
        Ok(PollOutcome::Alerted(alert))
    }

    /// Poll every tracked wallet once, in order, pacing between wallets
    async fn sweep(&self) -> Result<SweepStats> {
        let wallets = self.store.list_tracked_wallets()?;
        let mut stats = SweepStats::default();

        for wallet in &wallets {
            self.pacer.acquire().await;
            stats.wallets_checked += 1;
            match self.poll_wallet(wallet).await {
                Ok(outcome) => stats.tally(&outcome),
                Err(e) => {
                    error!("Failed to poll wallet {}: {}", wallet.address, e);
                    stats.failures += 1;
                }
            }
        }

        stats.finished_at = Some(Utc::now());
        debug!(
            "Sweep done: {} wallets, {} new signatures, {} alerts",
            stats.wallets_checked, stats.new_signatures, stats.alerts
        );
        *self.last_sweep.write().await = Some(stats.clone());
        Ok(stats)
    }
}

// ============================================================================
// WALLET MONITOR
// ============================================================================

/// Clear the running flag if no wallet is tracked. The count is checked under the
/// write lock, so a wallet added concurrently either keeps the task alive or sees
/// the flag cleared and starts a new one.
async fn release_if_idle(running: &RwLock<bool>, store: &TrackingStore) -> bool {
    let mut running = running.write().await;
    if store.tracked_count() > 0 {
        return false;
    }
    *running = false;
    true
}

/// Periodically sweeps the tracked wallets for new buys.
///
/// The background task stops on `stop()` or by itself once a sweep finds no
/// tracked wallets.
pub struct WalletMonitor {
    core: Arc<MonitorCore>,
    /// Running flag
    running: Arc<RwLock<bool>>,
    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl WalletMonitor {
    pub fn new(
        gateway: Arc<dyn ChainDataGateway>,
        store: Arc<TrackingStore>,
        notifications: Arc<NotificationManager>,
        config: MonitorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let pacer = RateLimiter::new("wallet-check", config.wallet_check_delay_ms);

        Self {
            core: Arc::new(MonitorCore {
                gateway,
                store,
                notifications,
                config,
                pacer,
                last_sweep: RwLock::new(None),
            }),
            running: Arc::new(RwLock::new(false)),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Start the sweep task. Fails if already running, the gateway has no
    /// credentials, or no wallet is tracked.
    pub async fn start(&self) -> Result<()> {
        if !self.core.gateway.is_configured() {
            return Err(TrackerError::Unavailable("chain data gateway not configured".to_string()).into());
        }
        if self.core.store.tracked_count() == 0 {
            return Err(TrackerError::Unavailable("no wallets are tracked".to_string()).into());
        }

        let mut running = self.running.write().await;
        if *running {
            return Err(anyhow!("Wallet monitor is already running"));
        }
        *running = true;
        drop(running);

        info!("👀 Starting wallet monitor...");
        info!(
            "📊 Poll interval: {} seconds, {} wallets tracked",
            self.core.config.poll_interval_secs,
            self.core.store.tracked_count()
        );

        self.spawn_polling_task();
        self.core
            .notifications
            .send_status_update("Monitor", "Wallet monitoring started")
            .await;
        Ok(())
    }

    /// Start unless already running. Returns true if this call started it.
    pub async fn ensure_running(&self) -> Result<bool> {
        if self.is_running().await {
            return Ok(false);
        }
        self.start().await?;
        Ok(true)
    }

    fn spawn_polling_task(&self) {
        let core = self.core.clone();
        let running = self.running.clone();
        let poll_interval = core.config.poll_interval_secs;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut poll_timer = interval(Duration::from_secs(poll_interval));

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        info!("Wallet monitor received shutdown signal");
                        break;
                    }

                    _ = poll_timer.tick() => {
                        if !*running.read().await {
                            break;
                        }

                        match core.sweep().await {
                            Ok(stats) if stats.wallets_checked == 0 => {
                                if release_if_idle(&running, &core.store).await {
                                    info!("No tracked wallets left, stopping wallet monitor");
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => error!("Wallet sweep failed: {}", e),
                        }
                    }
                }
            }
        });
    }

    pub async fn stop(&self) -> Result<()> {
        let was_running = std::mem::replace(&mut *self.running.write().await, false);
        let _ = self.shutdown_tx.send(());
        if was_running {
            info!("Stopping wallet monitor...");
            self.core
                .notifications
                .send_status_update("Monitor", "Wallet monitoring stopped")
                .await;
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run one sweep immediately, independent of the background task
    pub async fn sweep_now(&self) -> Result<SweepStats> {
        self.core.sweep().await
    }

    pub async fn poll_wallet(&self, wallet: &TrackedWallet) -> Result<PollOutcome> {
        self.core.poll_wallet(wallet).await
    }

    pub async fn last_sweep(&self) -> Option<SweepStats> {
        self.core.last_sweep.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockGateway;
    use crate::bot::notification::RecordingNotifier;
    use crate::models::transaction::fixtures::{swap, transfer_in};
    use crate::models::SignatureInfo;
    use solana_sdk::native_token::LAMPORTS_PER_SOL;

    const SOL: i64 = LAMPORTS_PER_SOL as i64;
    const FEE: u64 = 5_000;

    struct Harness {
        gateway: Arc<MockGateway>,
        store: Arc<TrackingStore>,
        notifier: Arc<RecordingNotifier>,
        monitor: WalletMonitor,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(TrackingStore::temporary().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = WalletMonitor::new(
            gateway.clone(),
            store.clone(),
            Arc::new(NotificationManager::new(notifier.clone())),
            MonitorConfig {
                wallet_check_delay_ms: 0,
                ..MonitorConfig::default()
            },
        );
        Harness {
            gateway,
            store,
            notifier,
            monitor,
        }
    }

    impl Harness {
        fn track(&self, address: &str) {
            let mut wallet = TrackedWallet::new_manual(address);
            wallet.profit_usd = 420.0;
            wallet.win_rate = 61.0;
            self.store.upsert_tracked_wallet(&wallet).unwrap();
        }

        async fn poll(&self, address: &str) -> PollOutcome {
            let wallet = self.store.get_tracked_wallet(address).unwrap().unwrap();
            self.monitor.poll_wallet(&wallet).await.unwrap()
        }

        fn cursor(&self, address: &str) -> Option<String> {
            self.store.get_tracked_wallet(address).unwrap().unwrap().last_signature
        }
    }

    #[tokio::test]
    async fn test_idle_release_keeps_running_when_wallet_was_added() {
        let h = harness();
        let running = RwLock::new(true);

        h.track("W1");
        assert!(!release_if_idle(&running, &h.store).await);
        assert!(*running.read().await);

        h.store.delete_tracked_wallet("W1").unwrap();
        assert!(release_if_idle(&running, &h.store).await);
        assert!(!*running.read().await);
    }

    #[tokio::test]
    async fn test_first_poll_only_sets_baseline() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("old-buy", "W1", 100, -SOL, FEE, "MintA"));

        assert_eq!(h.poll("W1").await, PollOutcome::Baseline("old-buy".to_string()));
        assert_eq!(h.cursor("W1").as_deref(), Some("old-buy"));
        assert_eq!(h.store.alert_count(), 0);
        assert_eq!(h.gateway.transaction_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unchanged_signature_does_nothing() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("s1", "W1", 100, -SOL, FEE, "MintA"));

        h.poll("W1").await;
        assert_eq!(h.poll("W1").await, PollOutcome::Unchanged);
        assert_eq!(h.store.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_non_swap_advances_without_alert() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("s1", "W1", 100, -SOL, FEE, "MintA"));
        h.poll("W1").await;

        h.gateway
            .push_transaction("W1", transfer_in("t1", "W1", "Someone", LAMPORTS_PER_SOL));
        assert_eq!(h.poll("W1").await, PollOutcome::Advanced("t1".to_string()));
        assert_eq!(h.cursor("W1").as_deref(), Some("t1"));
        assert_eq!(h.store.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_new_buy_alerts_once() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("s1", "W1", 100, -SOL, FEE, "MintA"));
        h.poll("W1").await;

        h.gateway.set_market_data("MintB", "BONK", 1_000_000.0);
        h.gateway
            .push_transaction("W1", swap("s2", "W1", 200, -SOL / 2, FEE, "MintB"));

        let PollOutcome::Alerted(alert) = h.poll("W1").await else {
            panic!("expected an alert");
        };
        assert_eq!(alert.token_mint, "MintB");
        assert_eq!(alert.token_symbol, "BONK");
        assert_eq!(alert.signature, "s2");
        assert!((alert.amount_sol - 0.5).abs() < 1e-9);

        let row = h.store.get_tracked_wallet("W1").unwrap().unwrap();
        assert_eq!(row.last_signature.as_deref(), Some("s2"));
        assert_eq!(row.last_trade_at, Some(200));
        // Discovery metrics survive the cursor update
        assert_eq!(row.profit_usd, 420.0);

        assert_eq!(h.poll("W1").await, PollOutcome::Unchanged);
        assert_eq!(h.store.alert_count(), 1);

        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("BONK"));
        assert!(messages[0].contains("61.0%"));
    }

    #[tokio::test]
    async fn test_small_or_failed_buys_do_not_alert() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("s1", "W1", 100, -SOL, FEE, "MintA"));
        h.poll("W1").await;

        // 0.005 SOL spent
        h.gateway
            .push_transaction("W1", swap("dust", "W1", 200, -(SOL / 200), FEE, "MintB"));
        assert_eq!(h.poll("W1").await, PollOutcome::Advanced("dust".to_string()));

        let mut failed = swap("failed", "W1", 300, -SOL, FEE, "MintC");
        failed.failed = true;
        h.gateway.push_transaction("W1", failed);
        assert_eq!(h.poll("W1").await, PollOutcome::Advanced("failed".to_string()));
        // A failed transaction is not a trade
        assert_eq!(h.store.get_tracked_wallet("W1").unwrap().unwrap().last_trade_at, Some(200));

        // A sell: token balance decreases
        let mut sell = swap("sell", "W1", 400, SOL, FEE, "MintA");
        sell.pre_token_balances = sell.post_token_balances.clone();
        sell.post_token_balances[0].ui_amount = 10.0;
        h.gateway.push_transaction("W1", sell);
        assert_eq!(h.poll("W1").await, PollOutcome::Advanced("sell".to_string()));

        assert_eq!(h.store.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_cursor_follows_every_new_signature() {
        let h = harness();
        h.track("W1");
        h.gateway.push_transaction("W1", swap("s0", "W1", 100, -SOL, FEE, "MintA"));
        h.poll("W1").await;

        for i in 1..=6 {
            let signature = format!("s{}", i);
            // Alternate buys, transfers and missing transactions
            match i % 3 {
                0 => h.gateway.push_transaction("W1", swap(&signature, "W1", 100 + i, -SOL, FEE, "MintB")),
                1 => h.gateway.push_transaction("W1", transfer_in(&signature, "W1", "F", LAMPORTS_PER_SOL)),
                _ => h.gateway.set_feed(
                    "W1",
                    vec![SignatureInfo {
                        signature: signature.clone(),
                        ..SignatureInfo::default()
                    }],
                ),
            }
            h.poll("W1").await;
            assert_eq!(h.cursor("W1"), Some(signature));
        }
        assert_eq!(h.store.alert_count(), 2);
    }

    #[tokio::test]
    async fn test_feed_failure_leaves_cursor() {
        let h = harness();
        h.track("W1");
        h.gateway.fail("W1");
        assert_eq!(h.poll("W1").await, PollOutcome::FeedUnavailable);
        assert_eq!(h.cursor("W1"), None);
    }

    #[tokio::test]
    async fn test_sweep_counts_outcomes() {
        let h = harness();
        h.track("W1");
        h.track("W2");
        h.track("W3");
        h.gateway.push_transaction("W1", swap("a", "W1", 100, -SOL, FEE, "MintA"));
        h.gateway.fail("W3");

        let stats = h.monitor.sweep_now().await.unwrap();
        assert_eq!(stats.wallets_checked, 3);
        assert_eq!(stats.baselines, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(h.monitor.last_sweep().await.unwrap().wallets_checked, 3);
    }

    #[tokio::test]
    async fn test_start_requires_tracked_wallets() {
        let h = harness();
        assert!(h.monitor.start().await.is_err());
        assert!(!h.monitor.is_running().await);

        h.track("W1");
        assert!(h.monitor.ensure_running().await.unwrap());
        assert!(!h.monitor.ensure_running().await.unwrap());
        assert!(h.monitor.start().await.is_err());

        h.monitor.stop().await.unwrap();
        assert!(!h.monitor.is_running().await);
    }
}
