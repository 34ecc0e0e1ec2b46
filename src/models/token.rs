use serde::{Deserialize, Serialize};

/// One entry of an address's signature feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SignatureInfo {
    pub signature: String,
    pub block_time: Option<i64>, // Unix seconds, may be absent
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenMarketData {
    pub mint: String,
    pub symbol: Option<String>,
    pub max_market_cap: f64, // USD
}
