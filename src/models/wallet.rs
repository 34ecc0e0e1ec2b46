use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which profitability profile a wallet satisfied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualifyingProfile {
    /// profit >= 50 USD and win rate >= 40%
    Balanced,
    /// profit >= 100 USD and win rate >= 30%
    HighProfit,
    /// profit >= 10 USD, win rate >= 60% and at least 15 swaps
    Consistent,
}

impl std::fmt::Display for QualifyingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => write!(f, "balanced"),
            Self::HighProfit => write!(f, "high_profit"),
            Self::Consistent => write!(f, "consistent"),
        }
    }
}

/// How a wallet entered the tracked set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WalletSource {
    Discovery,
    Manual,
}

/// Candidate score accumulated across token buyer lists during one discovery pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletScore {
    pub address: String,
    /// Distinct tracked tokens this wallet bought
    pub total_tokens: u32,
    /// Sum of percentile-rank bonuses
    pub early_entry_score: u32,
    pub first_seen: Option<i64>,
}

impl WalletScore {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            total_tokens: 0,
            early_entry_score: 0,
            first_seen: None,
        }
    }

    /// Ranking key used to pick candidates for full ledger analysis
    pub fn ranking_score(&self) -> u32 {
        self.early_entry_score + self.total_tokens * 2
    }
}

/// Persisted row for a watched wallet. Exactly one row per address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedWallet {
    pub address: String,
    pub added_at: DateTime<Utc>,
    pub source: WalletSource,
    pub profit_sol: f64,
    pub profit_usd: f64,
    /// 0-100
    pub win_rate: f64,
    pub token_count: usize,
    pub swap_count: usize,
    /// Unix seconds of the most recent observed trade
    pub last_trade_at: Option<i64>,
    /// Monitoring cursor
    pub last_signature: Option<String>,
    pub funding_source: Option<String>,
    pub profile: Option<QualifyingProfile>,
    pub early_entry_score: u32,
}

impl TrackedWallet {
    /// A manually added wallet with no metrics and no cursor yet
    pub fn new_manual(address: &str) -> Self {
        Self {
            address: address.to_string(),
            added_at: Utc::now(),
            source: WalletSource::Manual,
            profit_sol: 0.0,
            profit_usd: 0.0,
            win_rate: 0.0,
            token_count: 0,
            swap_count: 0,
            last_trade_at: None,
            last_signature: None,
            funding_source: None,
            profile: None,
            early_entry_score: 0,
        }
    }
}

/// Wallets sharing a funding source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletCluster {
    pub funding_source: String,
    pub wallets: Vec<String>,
    pub count: usize,
}
