//! Production gateway: Helius for chain history, Birdeye for market data,
//! each endpoint paced by its own [`RateLimiter`].

use async_trait::async_trait;
use tracing::{debug, warn};

use super::birdeye::BirdeyeClient;
use super::helius::HeliusClient;
use super::rate_limit::{RateLimiter, RateLimits};
use super::{ChainDataGateway, Fetched};
use crate::models::{SignatureInfo, TokenMarketData, TransactionRecord};

pub struct LiveGateway {
    helius: Option<HeliusClient>,
    birdeye: Option<BirdeyeClient>,
    signatures_limiter: RateLimiter,
    transaction_limiter: RateLimiter,
    market_limiter: RateLimiter,
}

impl LiveGateway {
    pub fn new(helius: Option<HeliusClient>, birdeye: Option<BirdeyeClient>, limits: &RateLimits) -> Self {
        Self {
            helius,
            birdeye,
            signatures_limiter: RateLimiter::new("signatures", limits.signatures_delay_ms),
            transaction_limiter: RateLimiter::new("transaction", limits.transaction_delay_ms),
            market_limiter: RateLimiter::new("market-data", limits.market_data_delay_ms),
        }
    }

    fn log_outcome<T>(what: &str, key: &str, outcome: &Fetched<T>) {
        match outcome {
            Fetched::Failed(e) => warn!("{} fetch failed for {}: {}", what, key, e),
            Fetched::Empty => debug!("{} fetch returned nothing for {}", what, key),
            Fetched::Data(_) => {}
        }
    }
}

#[async_trait]
impl ChainDataGateway for LiveGateway {
    fn is_configured(&self) -> bool {
        self.helius.is_some()
    }

    async fn fetch_signatures(&self, address: &str, limit: usize) -> Fetched<Vec<SignatureInfo>> {
        let Some(helius) = &self.helius else {
            return Fetched::Empty;
        };
        self.signatures_limiter.acquire().await;
        let outcome = Fetched::from_list(helius.get_signatures_for_address(address, limit).await);
        Self::log_outcome("Signatures", address, &outcome);
        outcome
    }

    async fn fetch_transaction(&self, signature: &str) -> Fetched<TransactionRecord> {
        let Some(helius) = &self.helius else {
            return Fetched::Empty;
        };
        self.transaction_limiter.acquire().await;
        let outcome = Fetched::from_result(helius.get_transaction(signature).await);
        Self::log_outcome("Transaction", signature, &outcome);
        outcome
    }

    async fn fetch_token_market_data(&self, mint: &str) -> Fetched<TokenMarketData> {
        let Some(birdeye) = &self.birdeye else {
            return Fetched::Empty;
        };
        self.market_limiter.acquire().await;
        let outcome = Fetched::from_result(birdeye.get_token_overview(mint).await).map(|overview| {
            TokenMarketData {
                mint: mint.to_string(),
                symbol: overview.symbol,
                max_market_cap: overview.mc.unwrap_or(0.0),
            }
        });
        Self::log_outcome("Market data", mint, &outcome);
        outcome
    }

    async fn fetch_trending_tokens(&self, limit: usize) -> Fetched<Vec<String>> {
        let Some(birdeye) = &self.birdeye else {
            return Fetched::Empty;
        };
        self.market_limiter.acquire().await;
        let outcome = Fetched::from_list(birdeye.get_trending_tokens(limit).await);
        Self::log_outcome("Trending tokens", "birdeye", &outcome);
        outcome
    }

    async fn search_new_tokens(&self, limit: usize) -> Fetched<Vec<String>> {
        let Some(birdeye) = &self.birdeye else {
            return Fetched::Empty;
        };
        self.market_limiter.acquire().await;
        let outcome = Fetched::from_list(birdeye.get_new_listings(limit).await);
        Self::log_outcome("New tokens", "birdeye", &outcome);
        outcome
    }

    async fn fetch_sol_price_usd(&self) -> Fetched<f64> {
        let Some(birdeye) = &self.birdeye else {
            return Fetched::Empty;
        };
        self.market_limiter.acquire().await;
        let outcome = Fetched::from_result(birdeye.get_sol_price_usd().await);
        Self::log_outcome("SOL price", "birdeye", &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_gateway_returns_empty() {
        let gateway = LiveGateway::new(None, None, &RateLimits::default());
        assert!(!gateway.is_configured());
        assert_eq!(gateway.fetch_signatures("W", 5).await, Fetched::Empty);
        assert_eq!(gateway.fetch_transaction("S").await, Fetched::Empty);
        assert_eq!(gateway.fetch_sol_price_usd().await, Fetched::Empty);
    }

    #[tokio::test]
    async fn test_unreachable_helius_is_failed_not_error() {
        // Nothing listens on port 9; the call fails and is tagged, not propagated.
        let helius = HeliusClient::new("http://127.0.0.1:9", "k").unwrap();
        let limits = RateLimits {
            signatures_delay_ms: 0,
            transaction_delay_ms: 0,
            market_data_delay_ms: 0,
        };
        let gateway = LiveGateway::new(Some(helius), None, &limits);
        assert!(gateway.fetch_signatures("W", 5).await.is_failed());
    }
}
