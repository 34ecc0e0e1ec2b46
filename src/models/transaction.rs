use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Token balance snapshot for one account of a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBalance {
    /// Index into the transaction's account list
    pub account_index: usize,
    pub mint: String,
    /// UI amount (already scaled by decimals); absent amounts are 0
    pub ui_amount: f64,
}

/// Normalized view of one on-chain transaction.
///
/// Immutable once fetched. Balances are in lamports, indexed like `account_keys`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub signature: String,
    pub block_time: Option<i64>,
    pub failed: bool,
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub fee: u64,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}

impl TransactionRecord {
    /// The fee-paying signer (first account)
    pub fn primary_account(&self) -> Option<&str> {
        self.account_keys.first().map(String::as_str)
    }

    /// A transaction is a swap iff it carries at least one post token balance.
    pub fn is_swap(&self) -> bool {
        !self.post_token_balances.is_empty()
    }

    /// True when no token balance appears on either side of the transaction.
    pub fn lacks_token_activity(&self) -> bool {
        self.pre_token_balances.is_empty() && self.post_token_balances.is_empty()
    }

    fn primary_delta_lamports(&self) -> i64 {
        match (self.pre_balances.first(), self.post_balances.first()) {
            (Some(&pre), Some(&post)) => post as i64 - pre as i64,
            _ => 0,
        }
    }

    /// Native balance change of the primary account, in SOL.
    pub fn primary_delta_sol(&self) -> f64 {
        self.primary_delta_lamports() as f64 / LAMPORTS_PER_SOL as f64
    }

    /// Native balance change of the primary account with the fee added back, in SOL.
    ///
    /// Zero when the balance arrays are missing so the fee alone never reads as a loss.
    pub fn primary_delta_sol_excluding_fee(&self) -> f64 {
        if self.pre_balances.is_empty() || self.post_balances.is_empty() {
            return 0.0;
        }
        (self.primary_delta_lamports() + self.fee as i64) as f64 / LAMPORTS_PER_SOL as f64
    }

    /// Post balances whose amount strictly grew versus the pre balance at the
    /// same account index (a missing pre balance counts as 0).
    pub fn token_increases(&self) -> impl Iterator<Item = &TokenBalance> + '_ {
        self.post_token_balances.iter().filter(move |post| {
            let pre = self
                .pre_token_balances
                .iter()
                .find(|pre| pre.account_index == post.account_index)
                .map(|pre| pre.ui_amount)
                .unwrap_or(0.0);
            post.ui_amount > pre
        })
    }

    /// Mint bought in this transaction; the last increasing entry wins.
    pub fn bought_mint(&self) -> Option<&str> {
        self.token_increases().last().map(|b| b.mint.as_str())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn token(account_index: usize, mint: &str, ui_amount: f64) -> TokenBalance {
        TokenBalance {
            account_index,
            mint: mint.to_string(),
            ui_amount,
        }
    }

    /// Swap where `signer` moves `delta_lamports` (fee already applied) and receives `mint`.
    pub fn swap(
        signature: &str,
        signer: &str,
        block_time: i64,
        delta_lamports: i64,
        fee: u64,
        mint: &str,
    ) -> TransactionRecord {
        let pre = 10 * LAMPORTS_PER_SOL;
        TransactionRecord {
            signature: signature.to_string(),
            block_time: Some(block_time),
            failed: false,
            account_keys: vec![signer.to_string(), "Pool111".to_string()],
            pre_balances: vec![pre, 0],
            post_balances: vec![(pre as i64 + delta_lamports) as u64, 0],
            fee,
            pre_token_balances: vec![],
            post_token_balances: vec![token(2, mint, 1000.0)],
        }
    }

    /// Plain SOL transfer from `from` into `to` (no token activity).
    pub fn transfer_in(signature: &str, to: &str, from: &str, lamports: u64) -> TransactionRecord {
        TransactionRecord {
            signature: signature.to_string(),
            block_time: Some(1_000),
            failed: false,
            account_keys: vec![to.to_string(), from.to_string()],
            pre_balances: vec![0, 100 * LAMPORTS_PER_SOL],
            post_balances: vec![lamports, 100 * LAMPORTS_PER_SOL - lamports],
            fee: 5_000,
            pre_token_balances: vec![],
            post_token_balances: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_fee_is_added_back() {
        let tx = swap("sig", "Wallet1", 100, -(LAMPORTS_PER_SOL as i64) - 5_000, 5_000, "MintA");
        assert!((tx.primary_delta_sol_excluding_fee() + 1.0).abs() < 1e-9);
        assert!(tx.primary_delta_sol() < -1.0);
    }

    #[test]
    fn test_missing_balances_contribute_nothing() {
        let tx = TransactionRecord {
            signature: "sig".to_string(),
            fee: 5_000,
            post_token_balances: vec![token(1, "MintA", 5.0)],
            ..Default::default()
        };
        assert_eq!(tx.primary_delta_sol_excluding_fee(), 0.0);
        assert_eq!(tx.primary_delta_sol(), 0.0);
        assert!(tx.primary_account().is_none());
    }

    #[test]
    fn test_bought_mint_last_increase_wins() {
        let mut tx = swap("sig", "Wallet1", 100, 0, 5_000, "MintA");
        tx.pre_token_balances = vec![token(2, "MintA", 1000.0), token(3, "MintB", 10.0)];
        tx.post_token_balances = vec![
            token(2, "MintA", 1000.0), // unchanged
            token(3, "MintB", 20.0),
            token(4, "MintC", 1.0), // no pre entry, counts from 0
        ];
        let bought: Vec<&str> = tx.token_increases().map(|b| b.mint.as_str()).collect();
        assert_eq!(bought, vec!["MintB", "MintC"]);
        assert_eq!(tx.bought_mint(), Some("MintC"));
    }

    #[test]
    fn test_decreasing_balance_is_not_a_buy() {
        let mut tx = swap("sig", "Wallet1", 100, 0, 5_000, "MintA");
        tx.pre_token_balances = vec![token(2, "MintA", 5000.0)];
        assert_eq!(tx.bought_mint(), None);
    }
}
