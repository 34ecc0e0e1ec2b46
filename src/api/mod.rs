//! Chain data access.
//!
//! Every fetch returns a [`Fetched`] value instead of an error: callers treat
//! `Empty` and `Failed` alike ("no data for this item") but can still tell them
//! apart for logging and tests.

pub mod birdeye;
pub mod gateway;
pub mod helius;
#[cfg(test)]
pub mod mock;
pub mod rate_limit;

use async_trait::async_trait;

use crate::models::{SignatureInfo, TokenMarketData, TransactionRecord};

pub use gateway::LiveGateway;

/// Outcome of one external fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The call succeeded and returned data
    Data(T),
    /// The call succeeded with nothing to return
    Empty,
    /// The call failed; the message is kept for logs
    Failed(String),
}

impl<T> Fetched<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Fetched::Failed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Data(value) => Some(value),
            Fetched::Empty | Fetched::Failed(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetched<U> {
        match self {
            Fetched::Data(value) => Fetched::Data(f(value)),
            Fetched::Empty => Fetched::Empty,
            Fetched::Failed(e) => Fetched::Failed(e),
        }
    }

    /// `Ok(None)` becomes `Empty`, errors become `Failed`.
    pub fn from_result(result: anyhow::Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Fetched::Data(value),
            Ok(None) => Fetched::Empty,
            Err(e) => Fetched::Failed(format!("{:#}", e)),
        }
    }
}

impl<T> Fetched<Vec<T>> {
    /// An empty list is reported as `Empty`.
    pub fn from_list(result: anyhow::Result<Vec<T>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Fetched::Empty,
            Ok(items) => Fetched::Data(items),
            Err(e) => Fetched::Failed(format!("{:#}", e)),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.into_option().unwrap_or_default()
    }
}

/// Normalized access to indexing services.
///
/// Implementations never propagate errors; see [`Fetched`].
#[async_trait]
pub trait ChainDataGateway: Send + Sync {
    /// False when credentials are missing and every call would come back empty
    fn is_configured(&self) -> bool {
        true
    }

    /// Most-recent-first signature feed for an address
    async fn fetch_signatures(&self, address: &str, limit: usize) -> Fetched<Vec<SignatureInfo>>;

    async fn fetch_transaction(&self, signature: &str) -> Fetched<TransactionRecord>;

    async fn fetch_token_market_data(&self, mint: &str) -> Fetched<TokenMarketData>;

    async fn fetch_trending_tokens(&self, limit: usize) -> Fetched<Vec<String>>;

    async fn search_new_tokens(&self, limit: usize) -> Fetched<Vec<String>>;

    async fn fetch_sol_price_usd(&self) -> Fetched<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_fetched_distinguishes_empty_from_failed() {
        let empty: Fetched<Vec<u32>> = Fetched::from_list(Ok(vec![]));
        let failed: Fetched<Vec<u32>> = Fetched::from_list(Err(anyhow!("boom")));
        let data: Fetched<Vec<u32>> = Fetched::from_list(Ok(vec![1]));

        assert_eq!(empty, Fetched::Empty);
        assert!(failed.is_failed());
        assert_eq!(data.clone().into_vec(), vec![1]);
        assert!(failed.into_vec().is_empty());
    }

    #[test]
    fn test_fetched_from_result() {
        assert_eq!(Fetched::from_result(Ok(Some(3))), Fetched::Data(3));
        assert_eq!(Fetched::<u8>::from_result(Ok(None)), Fetched::Empty);
        assert_eq!(Fetched::Data(2).map(|v| v * 2), Fetched::Data(4));
    }
}
