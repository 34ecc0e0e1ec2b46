use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::TrackerError;
use crate::models::{SignatureInfo, TokenBalance, TransactionRecord};

#[derive(Debug, Clone)]
pub struct HeliusClient {
    api_key: String,
    rpc_url: String,
    client: Client,
}

/// JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// --- getSignaturesForAddress ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSignature {
    pub signature: String,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

impl From<RpcSignature> for SignatureInfo {
    fn from(raw: RpcSignature) -> Self {
        SignatureInfo {
            signature: raw.signature,
            block_time: raw.block_time,
            failed: raw.err.is_some(),
        }
    }
}

// --- getTransaction ---
// Every field defaults so partial responses still produce a record.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTransaction {
    pub block_time: Option<i64>,
    pub meta: Option<RpcTransactionMeta>,
    pub transaction: RpcTransactionBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTransactionMeta {
    pub err: Option<serde_json::Value>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Option<Vec<RpcTokenBalance>>,
    pub post_token_balances: Option<Vec<RpcTokenBalance>>,
    pub loaded_addresses: Option<RpcLoadedAddresses>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTokenBalance {
    pub account_index: usize,
    pub mint: String,
    pub ui_token_amount: RpcUiTokenAmount,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcUiTokenAmount {
    pub ui_amount: Option<f64>,
    pub ui_amount_string: Option<String>,
}

impl RpcUiTokenAmount {
    fn value(&self) -> f64 {
        self.ui_amount
            .or_else(|| self.ui_amount_string.as_deref().and_then(|s| s.parse().ok()))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RpcLoadedAddresses {
    pub writable: Vec<String>,
    pub readonly: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RpcTransactionBody {
    pub signatures: Vec<String>,
    pub message: RpcMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcMessage {
    pub account_keys: Vec<RpcAccountKey>,
}

/// `json` encoding gives plain strings, `jsonParsed` gives objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RpcAccountKey {
    Plain(String),
    Parsed { pubkey: String },
}

impl RpcAccountKey {
    fn into_string(self) -> String {
        match self {
            RpcAccountKey::Plain(key) => key,
            RpcAccountKey::Parsed { pubkey } => pubkey,
        }
    }
}

impl From<RpcTokenBalance> for TokenBalance {
    fn from(raw: RpcTokenBalance) -> Self {
        TokenBalance {
            account_index: raw.account_index,
            ui_amount: raw.ui_token_amount.value(),
            mint: raw.mint,
        }
    }
}

impl RpcTransaction {
    /// Flatten into a [`TransactionRecord`]. Loaded lookup-table addresses are
    /// appended after the static keys (writable, then readonly) so token balance
    /// indices line up.
    pub fn into_record(self, signature: &str) -> TransactionRecord {
        let meta = self.meta.unwrap_or_default();

        let mut account_keys: Vec<String> = self
            .transaction
            .message
            .account_keys
            .into_iter()
            .map(RpcAccountKey::into_string)
            .collect();
        if let Some(loaded) = meta.loaded_addresses {
            account_keys.extend(loaded.writable);
            account_keys.extend(loaded.readonly);
        }

        let signature = self
            .transaction
            .signatures
            .into_iter()
            .next()
            .unwrap_or_else(|| signature.to_string());

        TransactionRecord {
            signature,
            block_time: self.block_time,
            failed: meta.err.is_some(),
            account_keys,
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
            fee: meta.fee,
            pre_token_balances: meta
                .pre_token_balances
                .unwrap_or_default()
                .into_iter()
                .map(TokenBalance::from)
                .collect(),
            post_token_balances: meta
                .post_token_balances
                .unwrap_or_default()
                .into_iter()
                .map(TokenBalance::from)
                .collect(),
        }
    }
}

impl HeliusClient {
    pub fn new(rpc_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for Helius")?;

        Ok(Self {
            api_key: api_key.to_string(),
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<Option<R>> {
        let url = format!("{}/?api-key={}", self.rpc_url, self.api_key);

        let rpc_request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "smart-money",
            method,
            params,
        };

        let response = self
            .client
            .post(&url)
            .json(&rpc_request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to Helius", method))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Helius {} error: {} - {}", method, status, error_text);
            return Err(TrackerError::ApiError(format!("Helius {}: {} - {}", method, status, error_text)).into());
        }

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Helius {} response", method))?;

        if let Some(err) = rpc_response.error {
            return Err(TrackerError::ApiError(format!(
                "Helius {} RPC error {}: {}",
                method, err.code, err.message
            ))
            .into());
        }

        Ok(rpc_response.result)
    }

    /// Most-recent-first signatures for an address
    pub async fn get_signatures_for_address(&self, address: &str, limit: usize) -> Result<Vec<SignatureInfo>> {
        let signatures: Vec<RpcSignature> = self
            .call("getSignaturesForAddress", json!([address, { "limit": limit }]))
            .await?
            .unwrap_or_default();

        debug!("Helius returned {} signatures for {}", signatures.len(), address);

        Ok(signatures.into_iter().map(SignatureInfo::from).collect())
    }

    /// Full transaction detail; `None` when the node does not know the signature
    pub async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRecord>> {
        let raw: Option<RpcTransaction> = self
            .call(
                "getTransaction",
                json!([
                    signature,
                    {
                        "encoding": "json",
                        "commitment": "confirmed",
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        Ok(raw.map(|tx| tx.into_record(signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_JSON: &str = r#"{
        "jsonrpc": "2.0",
        "id": "smart-money",
        "result": {
            "blockTime": 1700000000,
            "slot": 1,
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [2000000000, 0, 1],
                "postBalances": [1499995000, 0, 1],
                "preTokenBalances": [],
                "postTokenBalances": [
                    {"accountIndex": 3, "mint": "MintA", "uiTokenAmount": {"uiAmount": null, "uiAmountString": "1250.5", "decimals": 6, "amount": "1250500000"}}
                ],
                "loadedAddresses": {"writable": ["LoadedW"], "readonly": []}
            },
            "transaction": {
                "signatures": ["SigA"],
                "message": {"accountKeys": ["Buyer", "Pool", "Program"]}
            }
        }
    }"#;

    #[test]
    fn test_transaction_parsing() {
        let response: JsonRpcResponse<RpcTransaction> = serde_json::from_str(TX_JSON).unwrap();
        let record = response.result.unwrap().into_record("fallback");

        assert_eq!(record.signature, "SigA");
        assert_eq!(record.block_time, Some(1_700_000_000));
        assert!(!record.failed);
        assert_eq!(record.account_keys, vec!["Buyer", "Pool", "Program", "LoadedW"]);
        assert_eq!(record.fee, 5000);
        assert_eq!(record.post_token_balances.len(), 1);
        assert!((record.post_token_balances[0].ui_amount - 1250.5).abs() < 1e-9);
        assert!((record.primary_delta_sol_excluding_fee() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_transaction_defaults() {
        let raw: RpcTransaction =
            serde_json::from_str(r#"{"meta": {"err": {"InstructionError": [0, "Custom"]}, "preTokenBalances": null}}"#)
                .unwrap();
        let record = raw.into_record("SigB");
        assert_eq!(record.signature, "SigB");
        assert!(record.failed);
        assert!(record.account_keys.is_empty());
        assert!(record.pre_token_balances.is_empty());
        assert_eq!(record.block_time, None);
    }

    #[test]
    fn test_parsed_account_keys() {
        let message: RpcMessage =
            serde_json::from_str(r#"{"accountKeys": [{"pubkey": "A", "signer": true, "writable": true}, "B"]}"#)
                .unwrap();
        let keys: Vec<String> = message.account_keys.into_iter().map(RpcAccountKey::into_string).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_get_signatures_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::UrlEncoded("api-key".into(), "test-key".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","id":"smart-money","result":[
                    {"signature":"S2","blockTime":20,"err":null,"slot":2},
                    {"signature":"S1","blockTime":null,"err":{"InstructionError":[0,"Custom"]},"slot":1}
                ]}"#,
            )
            .create_async()
            .await;

        let client = HeliusClient::new(&server.url(), "test-key").unwrap();
        let signatures = client.get_signatures_for_address("Wallet1", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].signature, "S2");
        assert_eq!(signatures[0].block_time, Some(20));
        assert!(!signatures[0].failed);
        assert!(signatures[1].failed);
    }

    #[tokio::test]
    async fn test_rpc_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"smart-money","error":{"code":-32602,"message":"Invalid param"}}"#)
            .create_async()
            .await;

        let client = HeliusClient::new(&server.url(), "k").unwrap();
        let result = client.get_transaction("Sig").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"smart-money","result":null}"#)
            .create_async()
            .await;

        let client = HeliusClient::new(&server.url(), "k").unwrap();
        assert!(client.get_transaction("Sig").await.unwrap().is_none());
    }
}
