use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::api::rate_limit::RateLimits;
use crate::smart_money::discovery::DiscoveryConfig;
use crate::smart_money::monitor::MonitorConfig;
use crate::smart_money::scorer::ScoringThresholds;

const DEFAULT_HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub helius_rpc_url: String,
    pub helius_api_key: Option<String>,
    pub birdeye_api_key: Option<String>,

    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    pub api_host: Option<String>,
    pub api_port: Option<u16>,
    pub database_path: String,

    /// Mints whose early buyers seed discovery
    pub token_mints: Vec<String>,
    pub top_candidates: usize,
    pub signature_window: usize,
    pub wallet_history_limit: usize,
    pub fetch_concurrency: usize,
    pub max_discovery_tokens: usize,
    pub min_market_cap_usd: f64,

    pub sol_usd_rate: f64,
    pub refresh_sol_price: bool,

    // Pacing per endpoint
    pub signatures_delay_ms: u64,
    pub transaction_delay_ms: u64,
    pub market_data_delay_ms: u64,
    pub wallet_check_delay_ms: u64,

    pub monitor_interval_secs: u64,
    pub min_buy_sol: f64,
}

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Splits a comma separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    pub fn load() -> Self {
        let discovery = DiscoveryConfig::default();
        let limits = RateLimits::default();
        let monitor = MonitorConfig::default();

        Self {
            helius_rpc_url: env_opt("HELIUS_RPC_URL")
                .unwrap_or_else(|| DEFAULT_HELIUS_RPC_URL.to_string()),
            helius_api_key: env_opt("HELIUS_API_KEY"),
            birdeye_api_key: env_opt("BIRDEYE_API_KEY"),

            telegram_bot_token: env_opt("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: env_opt("TELEGRAM_CHAT_ID"),

            api_host: env_opt("API_HOST"),
            api_port: env_opt("API_PORT").and_then(|p| p.parse().ok()),
            database_path: env_opt("DATABASE_PATH")
                .unwrap_or_else(|| "data/tracker.db".to_string()),

            token_mints: env_opt("TOKEN_MINTS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            top_candidates: env_or("TOP_CANDIDATES", discovery.top_candidates),
            signature_window: env_or("SIGNATURE_WINDOW", discovery.signature_window),
            wallet_history_limit: env_or("WALLET_HISTORY_LIMIT", discovery.wallet_history_limit),
            fetch_concurrency: env_or("FETCH_CONCURRENCY", discovery.fetch_concurrency),
            max_discovery_tokens: env_or("MAX_DISCOVERY_TOKENS", discovery.max_tokens),
            min_market_cap_usd: env_or("MIN_MARKET_CAP_USD", discovery.min_market_cap_usd),

            sol_usd_rate: env_or("SOL_USD_RATE", discovery.thresholds.sol_usd_rate),
            refresh_sol_price: env_or("REFRESH_SOL_PRICE", discovery.refresh_sol_price),

            signatures_delay_ms: env_or("SIGNATURES_DELAY_MS", limits.signatures_delay_ms),
            transaction_delay_ms: env_or("TRANSACTION_DELAY_MS", limits.transaction_delay_ms),
            market_data_delay_ms: env_or("MARKET_DATA_DELAY_MS", limits.market_data_delay_ms),
            wallet_check_delay_ms: env_or("WALLET_CHECK_DELAY_MS", monitor.wallet_check_delay_ms),

            monitor_interval_secs: env_or("MONITOR_INTERVAL_SECS", monitor.poll_interval_secs),
            min_buy_sol: env_or("MIN_BUY_SOL", monitor.min_buy_sol),
        }
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            signatures_delay_ms: self.signatures_delay_ms,
            transaction_delay_ms: self.transaction_delay_ms,
            market_data_delay_ms: self.market_data_delay_ms,
        }
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            token_mints: self.token_mints.clone(),
            top_candidates: self.top_candidates.max(1),
            signature_window: self.signature_window.max(1),
            wallet_history_limit: self.wallet_history_limit.max(1),
            fetch_concurrency: self.fetch_concurrency.max(1),
            max_tokens: self.max_discovery_tokens.max(1),
            min_market_cap_usd: self.min_market_cap_usd,
            refresh_sol_price: self.refresh_sol_price,
            thresholds: ScoringThresholds {
                sol_usd_rate: self.sol_usd_rate,
                ..ScoringThresholds::default()
            },
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval_secs: self.monitor_interval_secs.max(1),
            wallet_check_delay_ms: self.wallet_check_delay_ms,
            min_buy_sol: self.min_buy_sol,
        }
    }
}
