//! In-memory gateway for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ChainDataGateway, Fetched};
use crate::models::{SignatureInfo, TokenMarketData, TransactionRecord};

#[derive(Default)]
pub struct MockGateway {
    /// address -> most-recent-first feed
    signatures: Mutex<HashMap<String, Vec<SignatureInfo>>>,
    transactions: Mutex<HashMap<String, TransactionRecord>>,
    market_data: Mutex<HashMap<String, TokenMarketData>>,
    trending: Mutex<Vec<String>>,
    new_tokens: Mutex<Vec<String>>,
    sol_price: Mutex<Option<f64>>,
    /// Addresses or signatures whose fetch fails
    failing: Mutex<HashSet<String>>,
    pub transaction_calls: AtomicUsize,
    pub signature_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a transaction and put its signature at the head of the signer's feed
    pub fn push_transaction(&self, address: &str, record: TransactionRecord) {
        let info = SignatureInfo {
            signature: record.signature.clone(),
            block_time: record.block_time,
            failed: record.failed,
        };
        self.signatures
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .insert(0, info);
        self.add_transaction(record);
    }

    /// Store a transaction without touching any feed
    pub fn add_transaction(&self, record: TransactionRecord) {
        self.transactions
            .lock()
            .unwrap()
            .insert(record.signature.clone(), record);
    }

    pub fn set_feed(&self, address: &str, feed: Vec<SignatureInfo>) {
        self.signatures.lock().unwrap().insert(address.to_string(), feed);
    }

    pub fn set_market_data(&self, mint: &str, symbol: &str, max_market_cap: f64) {
        self.market_data.lock().unwrap().insert(
            mint.to_string(),
            TokenMarketData {
                mint: mint.to_string(),
                symbol: Some(symbol.to_string()),
                max_market_cap,
            },
        );
    }

    pub fn set_trending(&self, mints: &[&str]) {
        *self.trending.lock().unwrap() = mints.iter().map(|m| m.to_string()).collect();
    }

    pub fn set_new_tokens(&self, mints: &[&str]) {
        *self.new_tokens.lock().unwrap() = mints.iter().map(|m| m.to_string()).collect();
    }

    pub fn set_sol_price(&self, price: f64) {
        *self.sol_price.lock().unwrap() = Some(price);
    }

    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    fn is_failing(&self, key: &str) -> bool {
        self.failing.lock().unwrap().contains(key)
    }
}

fn list<T>(items: Vec<T>) -> Fetched<Vec<T>> {
    if items.is_empty() {
        Fetched::Empty
    } else {
        Fetched::Data(items)
    }
}

#[async_trait]
impl ChainDataGateway for MockGateway {
    async fn fetch_signatures(&self, address: &str, limit: usize) -> Fetched<Vec<SignatureInfo>> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing(address) {
            return Fetched::Failed(format!("signatures for {} unavailable", address));
        }
        let feed = self
            .signatures
            .lock()
            .unwrap()
            .get(address)
            .map(|feed| feed.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        list(feed)
    }

    async fn fetch_transaction(&self, signature: &str) -> Fetched<TransactionRecord> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing(signature) {
            return Fetched::Failed(format!("transaction {} unavailable", signature));
        }
        match self.transactions.lock().unwrap().get(signature) {
            Some(record) => Fetched::Data(record.clone()),
            None => Fetched::Empty,
        }
    }

    async fn fetch_token_market_data(&self, mint: &str) -> Fetched<TokenMarketData> {
        if self.is_failing(mint) {
            return Fetched::Failed(format!("market data for {} unavailable", mint));
        }
        match self.market_data.lock().unwrap().get(mint) {
            Some(data) => Fetched::Data(data.clone()),
            None => Fetched::Empty,
        }
    }

    async fn fetch_trending_tokens(&self, limit: usize) -> Fetched<Vec<String>> {
        list(self.trending.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn search_new_tokens(&self, limit: usize) -> Fetched<Vec<String>> {
        list(self.new_tokens.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn fetch_sol_price_usd(&self) -> Fetched<f64> {
        match *self.sol_price.lock().unwrap() {
            Some(price) => Fetched::Data(price),
            None => Fetched::Empty,
        }
    }
}
