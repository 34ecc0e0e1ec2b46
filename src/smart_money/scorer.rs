//! Wallet Scorer
//!
//! Turns a [`WalletLedger`] into metrics and decides smart-money membership.
//! A wallet qualifies when it matches any profitability profile AND has traded
//! recently (or has no recorded trade time at all).

use serde::Serialize;

use super::ledger::WalletLedger;
use crate::models::QualifyingProfile;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize)]
pub struct ScoringThresholds {
    /// Fixed SOL -> USD conversion used for profit
    pub sol_usd_rate: f64,
    pub max_inactive_days: i64,

    pub balanced_min_profit_usd: f64,
    pub balanced_min_win_rate: f64,

    pub high_profit_min_profit_usd: f64,
    pub high_profit_min_win_rate: f64,

    pub consistent_min_profit_usd: f64,
    pub consistent_min_win_rate: f64,
    pub consistent_min_swaps: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            sol_usd_rate: 150.0,
            max_inactive_days: 7,
            balanced_min_profit_usd: 50.0,
            balanced_min_win_rate: 40.0,
            high_profit_min_profit_usd: 100.0,
            high_profit_min_win_rate: 30.0,
            consistent_min_profit_usd: 10.0,
            consistent_min_win_rate: 60.0,
            consistent_min_swaps: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WalletMetrics {
    pub profit_sol: f64,
    pub profit_usd: f64,
    /// 0-100
    pub win_rate: f64,
    pub swap_count: usize,
    pub token_count: usize,
    pub last_trade_at: Option<i64>,
    pub days_since_last_trade: Option<i64>,
}

impl WalletMetrics {
    pub fn from_ledger(ledger: &WalletLedger, sol_usd_rate: f64, now: i64) -> Self {
        let profit_sol = ledger.profit_sol();
        Self {
            profit_sol,
            profit_usd: profit_sol * sol_usd_rate,
            win_rate: win_rate(ledger.profitable_trades, ledger.losing_trades),
            swap_count: ledger.swap_count,
            token_count: ledger.mints.len(),
            last_trade_at: ledger.last_trade_at,
            days_since_last_trade: ledger.last_trade_at.map(|last| days_since(last, now)),
        }
    }
}

/// Percentage of decided trades that were profitable; 0 when none were decided
pub fn win_rate(profitable: u32, losing: u32) -> f64 {
    let decided = profitable + losing;
    if decided == 0 {
        return 0.0;
    }
    profitable as f64 / decided as f64 * 100.0
}

/// Whole days elapsed, floored
pub fn days_since(timestamp: i64, now: i64) -> i64 {
    (now - timestamp).div_euclid(SECONDS_PER_DAY)
}

/// First profitability profile the metrics satisfy, if any
pub fn matching_profile(metrics: &WalletMetrics, t: &ScoringThresholds) -> Option<QualifyingProfile> {
    let profit = metrics.profit_usd;
    let win_rate = metrics.win_rate;

    if profit >= t.balanced_min_profit_usd && win_rate >= t.balanced_min_win_rate {
        Some(QualifyingProfile::Balanced)
    } else if profit >= t.high_profit_min_profit_usd && win_rate >= t.high_profit_min_win_rate {
        Some(QualifyingProfile::HighProfit)
    } else if profit >= t.consistent_min_profit_usd
        && win_rate >= t.consistent_min_win_rate
        && metrics.swap_count >= t.consistent_min_swaps
    {
        Some(QualifyingProfile::Consistent)
    } else {
        None
    }
}

/// Missing trade time counts as recent
pub fn is_recently_active(metrics: &WalletMetrics, t: &ScoringThresholds) -> bool {
    metrics
        .days_since_last_trade
        .map_or(true, |days| days <= t.max_inactive_days)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Classification {
    pub metrics: WalletMetrics,
    pub profile: Option<QualifyingProfile>,
    pub recently_active: bool,
}

impl Classification {
    pub fn qualifies(&self) -> bool {
        self.profile.is_some() && self.recently_active
    }
}

pub fn classify(ledger: &WalletLedger, thresholds: &ScoringThresholds, now: i64) -> Classification {
    let metrics = WalletMetrics::from_ledger(ledger, thresholds.sol_usd_rate, now);
    Classification {
        profile: matching_profile(&metrics, thresholds),
        recently_active: is_recently_active(&metrics, thresholds),
        metrics,
    }
}
