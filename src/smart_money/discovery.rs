//! Discovery Orchestrator
//!
//! Mines the early buyers of a set of tokens, ranks them by how early and how
//! often they bought, runs full ledger analysis on the top candidates only and
//! persists the wallets that qualify as smart money.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::cluster::build_clusters;
use super::ledger::WalletLedger;
use super::monitor::WalletMonitor;
use super::scorer::{classify, Classification, ScoringThresholds};
use crate::api::{ChainDataGateway, Fetched};
use crate::bot::notification::NotificationManager;
use crate::error::TrackerError;
use crate::models::{TrackedWallet, TransactionRecord, WalletCluster, WalletScore, WalletSource};
use crate::storage::TrackingStore;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryConfig {
    /// Mints to mine for buyers; empty means trending + new listings
    pub token_mints: Vec<String>,
    /// Candidates that get a full ledger analysis
    pub top_candidates: usize,
    /// Signatures fetched per token
    pub signature_window: usize,
    /// Signatures fetched per candidate wallet
    pub wallet_history_limit: usize,
    /// Transaction fetches in flight at once
    pub fetch_concurrency: usize,
    pub max_tokens: usize,
    /// 0 disables the market cap filter
    pub min_market_cap_usd: f64,
    pub refresh_sol_price: bool,
    pub thresholds: ScoringThresholds,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            token_mints: Vec::new(),
            top_candidates: 8,
            signature_window: 30,
            wallet_history_limit: 50,
            fetch_concurrency: 1,
            max_tokens: 10,
            min_market_cap_usd: 0.0,
            refresh_sol_price: true,
            thresholds: ScoringThresholds::default(),
        }
    }
}

/// Program and infrastructure accounts that sign swaps but are never buyers
pub const EARLY_BUYER_BLACKLIST: &[&str] = &[
    "11111111111111111111111111111111",
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
    "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb",
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
    "ComputeBudget111111111111111111111111111111",
    "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
    "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",
    "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",
    "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",
    "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1",
];

// ============================================================================
// BUYER ENUMERATION & EARLY-ENTRY SCORING
// ============================================================================

/// A token buyer and the earliest time it was seen buying
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Buyer {
    pub address: String,
    pub first_seen: Option<i64>,
}

/// Primary signer of a successful transaction that moved token balances,
/// unless it is a known program or infrastructure account.
pub fn extract_buyer(tx: &TransactionRecord) -> Option<&str> {
    if tx.failed || !tx.is_swap() {
        return None;
    }
    tx.primary_account()
        .filter(|signer| !EARLY_BUYER_BLACKLIST.contains(signer))
}

/// Deduplicated buyers sorted by first purchase, earliest first.
///
/// Ties (and missing block times, which sort last) keep encounter order.
pub fn collect_buyers(records: &[TransactionRecord]) -> Vec<Buyer> {
    let mut buyers: Vec<Buyer> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for tx in records {
        let Some(address) = extract_buyer(tx) else {
            continue;
        };
        match positions.get(address) {
            Some(&idx) => {
                let buyer = &mut buyers[idx];
                buyer.first_seen = earliest(buyer.first_seen, tx.block_time);
            }
            None => {
                positions.insert(address, buyers.len());
                buyers.push(Buyer {
                    address: address.to_string(),
                    first_seen: tx.block_time,
                });
            }
        }
    }

    buyers.sort_by_key(|b| (b.first_seen.is_none(), b.first_seen));
    buyers
}

fn earliest(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Bonus for buying at `index` of a time-sorted buyer list of length `len`
pub fn early_entry_bonus(index: usize, len: usize) -> u32 {
    if len == 0 {
        return 0;
    }
    let percentile = index as f64 / len as f64;
    if percentile <= 0.05 {
        15
    } else if percentile <= 0.10 {
        10
    } else if percentile <= 0.20 {
        5
    } else {
        0
    }
}

/// Fold one token's buyer list into the running candidate scores
pub fn accumulate_scores(scores: &mut HashMap<String, WalletScore>, buyers: &[Buyer]) {
    for (index, buyer) in buyers.iter().enumerate() {
        let score = scores
            .entry(buyer.address.clone())
            .or_insert_with(|| WalletScore::new(&buyer.address));
        score.total_tokens += 1;
        score.early_entry_score += early_entry_bonus(index, buyers.len());
        score.first_seen = earliest(score.first_seen, buyer.first_seen);
    }
}

/// Top `limit` candidates by ranking score; ties go to the earlier buyer, then by address.
pub fn rank_candidates(scores: HashMap<String, WalletScore>, limit: usize) -> Vec<WalletScore> {
    let mut ranked: Vec<WalletScore> = scores.into_values().collect();
    ranked.sort_by(|a, b| {
        b.ranking_score()
            .cmp(&a.ranking_score())
            .then_with(|| (a.first_seen.is_none(), a.first_seen).cmp(&(b.first_seen.is_none(), b.first_seen)))
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked.truncate(limit);
    ranked
}

fn dedupe(mints: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    mints.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedWallet {
    pub score: WalletScore,
    pub funding_source: Option<String>,
    #[serde(flatten)]
    pub classification: Classification,
}

impl AnalyzedWallet {
    pub fn address(&self) -> &str {
        &self.score.address
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tokens_scanned: Vec<String>,
    pub buyers_seen: usize,
    pub candidates_ranked: usize,
    pub wallets_analyzed: usize,
    pub sol_usd_rate: f64,
    pub qualifying: Vec<AnalyzedWallet>,
    pub clusters: Vec<WalletCluster>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct DiscoveryOrchestrator {
    gateway: Arc<dyn ChainDataGateway>,
    store: Arc<TrackingStore>,
    monitor: Arc<WalletMonitor>,
    notifications: Arc<NotificationManager>,
    config: DiscoveryConfig,
    /// Held for the duration of a run
    run_lock: Mutex<()>,
    clusters: RwLock<Vec<WalletCluster>>,
    last_report: RwLock<Option<DiscoveryReport>>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        gateway: Arc<dyn ChainDataGateway>,
        store: Arc<TrackingStore>,
        monitor: Arc<WalletMonitor>,
        notifications: Arc<NotificationManager>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            monitor,
            notifications,
            config,
            run_lock: Mutex::new(()),
            clusters: RwLock::new(Vec::new()),
            last_report: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Clusters found by the last completed run
    pub async fn clusters(&self) -> Vec<WalletCluster> {
        self.clusters.read().await.clone()
    }

    pub async fn last_report(&self) -> Option<DiscoveryReport> {
        self.last_report.read().await.clone()
    }

    /// Run one discovery pass over `mints` (or the configured token source).
    ///
    /// Fails with [`TrackerError::Unavailable`] when the gateway has no
    /// credentials, there is nothing to scan, or another run is in flight.
    pub async fn run(&self, mints: Option<Vec<String>>) -> Result<DiscoveryReport> {
        if !self.gateway.is_configured() {
            warn!("Discovery requested but no chain data credentials are configured");
            return Err(TrackerError::Unavailable("chain data gateway not configured".to_string()).into());
        }

        let Ok(_guard) = self.run_lock.try_lock() else {
            return Err(TrackerError::Unavailable("discovery already running".to_string()).into());
        };

        let started_at = Utc::now();
        let tokens = self.select_tokens(mints).await;
        if tokens.is_empty() {
            warn!("Discovery found no tokens to scan");
            return Err(TrackerError::Unavailable("no tokens to scan".to_string()).into());
        }

        info!("🔍 Starting smart money discovery over {} tokens", tokens.len());
        let thresholds = self.current_thresholds().await;

        let mut scores: HashMap<String, WalletScore> = HashMap::new();
        let mut buyers_seen = 0;
        for mint in &tokens {
            let buyers = self.enumerate_buyers(mint).await;
            debug!("{} buyers found for {}", buyers.len(), mint);
            buyers_seen += buyers.len();
            accumulate_scores(&mut scores, &buyers);
        }

        let candidates_ranked = scores.len();
        let candidates = rank_candidates(scores, self.config.top_candidates);
        info!(
            "📊 {} candidate wallets ranked, analysing top {}",
            candidates_ranked,
            candidates.len()
        );

        let now = Utc::now().timestamp();
        let mut qualifying = Vec::new();
        for candidate in &candidates {
            let analyzed = self.analyze_wallet(candidate, &thresholds, now).await;
            if analyzed.classification.qualifies() {
                info!(
                    "💰 Smart money found: {} ({:.2} USD, {:.1}% win rate)",
                    analyzed.address(),
                    analyzed.classification.metrics.profit_usd,
                    analyzed.classification.metrics.win_rate
                );
                qualifying.push(analyzed);
            }
        }

        let clusters = build_clusters(
            qualifying
                .iter()
                .map(|w| (w.address(), w.funding_source.as_deref())),
        );
        if !clusters.is_empty() {
            info!("🕸️ {} possible wallet clusters detected", clusters.len());
        }

        for wallet in &qualifying {
            self.persist(wallet)?;
        }

        let report = DiscoveryReport {
            started_at,
            finished_at: Utc::now(),
            tokens_scanned: tokens,
            buyers_seen,
            candidates_ranked,
            wallets_analyzed: candidates.len(),
            sol_usd_rate: thresholds.sol_usd_rate,
            qualifying,
            clusters: clusters.clone(),
        };
        *self.clusters.write().await = clusters;
        *self.last_report.write().await = Some(report.clone());

        if self.store.tracked_count() > 0 {
            if let Err(e) = self.monitor.ensure_running().await {
                error!("Failed to start wallet monitor after discovery: {}", e);
            }
        }

        self.notifications.send_discovery_summary(&report).await;
        info!(
            "✅ Discovery complete: {} of {} analysed wallets qualified",
            report.qualifying.len(),
            report.wallets_analyzed
        );

        Ok(report)
    }

    /// Requested mints, else configured mints, else trending and new tokens
    /// filtered by market cap. Always capped at `max_tokens`.
    async fn select_tokens(&self, requested: Option<Vec<String>>) -> Vec<String> {
        let explicit = requested
            .filter(|mints| !mints.is_empty())
            .unwrap_or_else(|| self.config.token_mints.clone());
        if !explicit.is_empty() {
            let mut tokens = dedupe(explicit);
            tokens.truncate(self.config.max_tokens);
            return tokens;
        }

        let limit = self.config.max_tokens;
        let trending = self.gateway.fetch_trending_tokens(limit).await.into_vec();
        let fresh = self.gateway.search_new_tokens(limit).await.into_vec();
        let candidates = dedupe(trending.into_iter().chain(fresh));
        debug!("{} trending/new tokens before market cap filter", candidates.len());

        if self.config.min_market_cap_usd <= 0.0 {
            let mut tokens = candidates;
            tokens.truncate(limit);
            return tokens;
        }

        let mut tokens = Vec::new();
        for mint in candidates {
            if tokens.len() >= limit {
                break;
            }
            match self.gateway.fetch_token_market_data(&mint).await {
                Fetched::Data(data) if data.max_market_cap >= self.config.min_market_cap_usd => tokens.push(mint),
                _ => debug!("Skipping {} below market cap filter", mint),
            }
        }
        tokens
    }

    async fn current_thresholds(&self) -> ScoringThresholds {
        let mut thresholds = self.config.thresholds.clone();
        if self.config.refresh_sol_price {
            match self.gateway.fetch_sol_price_usd().await {
                Fetched::Data(price) if price > 0.0 => {
                    debug!("Using live SOL price {:.2} USD", price);
                    thresholds.sol_usd_rate = price;
                }
                _ => debug!("Using fixed SOL price {:.2} USD", thresholds.sol_usd_rate),
            }
        }
        thresholds
    }

    /// Buyers of `mint` within the recent signature window, earliest first
    async fn enumerate_buyers(&self, mint: &str) -> Vec<Buyer> {
        let signatures: Vec<String> = self
            .gateway
            .fetch_signatures(mint, self.config.signature_window)
            .await
            .into_vec()
            .into_iter()
            .filter(|s| !s.failed)
            .map(|s| s.signature)
            .collect();

        let records = self.fetch_transactions(signatures).await;
        collect_buyers(&records)
    }

    /// Fetch details with bounded concurrency, keeping input order.
    /// Items with no data are dropped.
    async fn fetch_transactions(&self, signatures: Vec<String>) -> Vec<TransactionRecord> {
        let gateway = &self.gateway;
        stream::iter(signatures)
            .map(|signature| async move { gateway.fetch_transaction(&signature).await })
            .buffered(self.config.fetch_concurrency.max(1))
            .filter_map(|fetched| async move { fetched.into_option() })
            .collect()
            .await
    }

    async fn analyze_wallet(&self, candidate: &WalletScore, thresholds: &ScoringThresholds, now: i64) -> AnalyzedWallet {
        let signatures: Vec<String> = self
            .gateway
            .fetch_signatures(&candidate.address, self.config.wallet_history_limit)
            .await
            .into_vec()
            .into_iter()
            .filter(|s| !s.failed)
            .map(|s| s.signature)
            .collect();

        // Feed is newest first; the ledger wants oldest first.
        let mut records = self.fetch_transactions(signatures).await;
        records.reverse();

        let ledger = WalletLedger::from_transactions(&candidate.address, &records);
        AnalyzedWallet {
            score: candidate.clone(),
            funding_source: ledger.funding_source.clone(),
            classification: classify(&ledger, thresholds, now),
        }
    }

    /// Merge fresh metrics into the wallet's row, keeping the existing `added_at`,
    /// source and cursor. The merge is atomic against concurrent cursor updates.
    fn persist(&self, wallet: &AnalyzedWallet) -> Result<()> {
        let address = wallet.address();
        let metrics = &wallet.classification.metrics;

        self.store.update_tracked_wallet(address, |current| {
            let mut row = current.unwrap_or_else(|| TrackedWallet {
                source: WalletSource::Discovery,
                ..TrackedWallet::new_manual(address)
            });
            row.profit_sol = metrics.profit_sol;
            row.profit_usd = metrics.profit_usd;
            row.win_rate = metrics.win_rate;
            row.token_count = metrics.token_count;
            row.swap_count = metrics.swap_count;
            row.last_trade_at = row.last_trade_at.max(metrics.last_trade_at);
            row.funding_source = wallet.funding_source.clone();
            row.profile = wallet.classification.profile;
            row.early_entry_score = wallet.score.early_entry_score;
            Some(row)
        })?;
        Ok(())
    }
}
