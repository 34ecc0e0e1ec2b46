use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const BIRDEYE_BASE_URL: &str = "https://public-api.birdeye.so";
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    api_key: String,
    base_url: String,
    client: Client,
}

// --- Response Structs ---

/// Birdeye wraps every payload in `{ success, data }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    success: bool,
}

// Structure for the /defi/token_overview endpoint response
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenOverviewData {
    pub address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>, // Price in USD
    pub mc: Option<f64>,    // Market Cap in USD
    pub liquidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TrendingData {
    #[serde(default)]
    tokens: Vec<TokenAddress>,
}

#[derive(Debug, Deserialize)]
struct NewListingData {
    #[serde(default)]
    items: Vec<TokenAddress>,
}

#[derive(Debug, Deserialize)]
struct TokenAddress {
    address: String,
}

// Structure for the /defi/price endpoint response (used for SOL price)
#[derive(Debug, Deserialize)]
struct PriceData {
    value: f64,
}

// --- Birdeye Client Implementation ---

impl BirdeyeClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, BIRDEYE_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create HTTP client for Birdeye")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET an endpoint and unwrap the envelope.
    ///
    /// A non-success status or `success: false` is an error; a missing `data` is `None`.
    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("Birdeye request: {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Birdeye {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Birdeye {} error: {} - {}", endpoint, status, error_text);
            anyhow::bail!("Birdeye {} error: {} - {}", endpoint, status, error_text);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Birdeye {} response", endpoint))?;

        if !envelope.success {
            anyhow::bail!("Birdeye {} reported failure", endpoint);
        }

        Ok(envelope.data)
    }

    /// Fetches the token overview (market cap, symbol) from /defi/token_overview.
    pub async fn get_token_overview(&self, token_address: &str) -> Result<Option<TokenOverviewData>> {
        self.get("/defi/token_overview", &[("address", token_address.to_string())])
            .await
    }

    /// Trending token mints, best ranked first
    pub async fn get_trending_tokens(&self, limit: usize) -> Result<Vec<String>> {
        let data: Option<TrendingData> = self
            .get(
                "/defi/token_trending",
                &[
                    ("sort_by", "rank".to_string()),
                    ("sort_type", "asc".to_string()),
                    ("offset", "0".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(data
            .map(|d| d.tokens.into_iter().map(|t| t.address).collect())
            .unwrap_or_default())
    }

    /// Newly listed token mints
    pub async fn get_new_listings(&self, limit: usize) -> Result<Vec<String>> {
        let data: Option<NewListingData> = self
            .get("/defi/v2/tokens/new_listing", &[("limit", limit.to_string())])
            .await?;

        Ok(data
            .map(|d| d.items.into_iter().map(|t| t.address).collect())
            .unwrap_or_default())
    }

    /// SOL price in USD from /defi/price
    pub async fn get_sol_price_usd(&self) -> Result<Option<f64>> {
        let data: Option<PriceData> = self
            .get("/defi/price", &[("address", SOL_MINT.to_string())])
            .await?;

        Ok(data.map(|d| d.value).filter(|price| *price > 0.0))
    }
}
