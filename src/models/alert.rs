use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Buy,
}

impl std::fmt::Display for AlertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
        }
    }
}

/// Append-only record of an activity alert; unique per (wallet, signature)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub action: AlertAction,
    pub token_mint: String,
    pub token_symbol: String,
    /// SOL spent
    pub amount_sol: f64,
    pub signature: String,
}

impl Alert {
    pub fn new_buy(
        wallet: &str,
        token_mint: &str,
        token_symbol: &str,
        amount_sol: f64,
        signature: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            wallet: wallet.to_string(),
            action: AlertAction::Buy,
            token_mint: token_mint.to_string(),
            token_symbol: token_symbol.to_string(),
            amount_sol,
            signature: signature.to_string(),
        }
    }
}
