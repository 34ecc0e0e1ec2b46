//! Trade Reconstructor
//!
//! Folds a wallet's transaction records into a [`WalletLedger`]: SOL spent and
//! received on swaps, win/loss counts, distinct mints, last trade time and the
//! inferred funding source.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::TransactionRecord;

/// Per-swap net change (SOL) beyond which a trade counts as won or lost
pub const TRADE_DECISION_BAND_SOL: f64 = 0.001;

/// Minimum incoming SOL for a plain transfer to identify a funding source
pub const FUNDING_THRESHOLD_SOL: f64 = 0.1;

/// Transient per-wallet ledger, rebuilt on every analysis run
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct WalletLedger {
    pub wallet: String,
    pub sol_spent: f64,
    pub sol_received: f64,
    pub swap_count: usize,
    pub mints: BTreeSet<String>,
    pub profitable_trades: u32,
    pub losing_trades: u32,
    pub last_trade_at: Option<i64>,
    pub funding_source: Option<String>,
}

impl WalletLedger {
    pub fn new(wallet: &str) -> Self {
        Self {
            wallet: wallet.to_string(),
            ..Default::default()
        }
    }

    /// Build a ledger from records in the order given (oldest first, so the
    /// first qualifying transfer is the earliest one).
    pub fn from_transactions<'a, I>(wallet: &str, records: I) -> Self
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        let mut ledger = Self::new(wallet);
        for record in records {
            ledger.record(record);
        }
        ledger
    }

    /// Fold one transaction into the ledger. Errored transactions are skipped.
    pub fn record(&mut self, tx: &TransactionRecord) {
        if tx.failed {
            return;
        }

        if tx.is_swap() {
            self.record_swap(tx);
        } else if self.funding_source.is_none() && tx.lacks_token_activity() {
            self.infer_funding_source(tx);
        }
    }

    fn record_swap(&mut self, tx: &TransactionRecord) {
        self.swap_count += 1;
        self.mints.extend(
            tx.post_token_balances
                .iter()
                .filter(|b| !b.mint.is_empty())
                .map(|b| b.mint.clone()),
        );

        // Spent and received are kept apart; profit is their difference.
        let delta = tx.primary_delta_sol_excluding_fee();
        if delta > 0.0 {
            self.sol_received += delta;
        } else if delta < 0.0 {
            self.sol_spent += -delta;
        }

        if delta > TRADE_DECISION_BAND_SOL {
            self.profitable_trades += 1;
        } else if delta < -TRADE_DECISION_BAND_SOL {
            self.losing_trades += 1;
        }

        if let Some(time) = tx.block_time {
            self.last_trade_at = Some(self.last_trade_at.map_or(time, |prev| prev.max(time)));
        }
    }

    fn infer_funding_source(&mut self, tx: &TransactionRecord) {
        if tx.primary_delta_sol() <= FUNDING_THRESHOLD_SOL {
            return;
        }
        if let Some(funder) = tx.account_keys.get(1) {
            if funder != &self.wallet {
                self.funding_source = Some(funder.clone());
            }
        }
    }

    /// received - spent, in SOL
    pub fn profit_sol(&self) -> f64 {
        self.sol_received - self.sol_spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::fixtures::{swap, transfer_in};
    use solana_sdk::native_token::LAMPORTS_PER_SOL;

    const SOL: i64 = LAMPORTS_PER_SOL as i64;
    const FEE: u64 = 5_000;

    /// Swap whose fee-neutral delta is `delta_sol`
    fn trade(sig: &str, time: i64, delta_sol: f64, mint: &str) -> crate::models::TransactionRecord {
        let delta = (delta_sol * SOL as f64) as i64 - FEE as i64;
        swap(sig, "Wallet1", time, delta, FEE, mint)
    }

    #[test]
    fn test_profit_is_received_minus_spent() {
        let records = vec![
            trade("s1", 10, -1.0, "MintA"),
            trade("s2", 20, 1.5, "MintA"),
            trade("s3", 30, -0.25, "MintB"),
            trade("s4", 40, 0.75, "MintB"),
        ];
        let ledger = WalletLedger::from_transactions("Wallet1", &records);

        assert!((ledger.sol_spent - 1.25).abs() < 1e-9);
        assert!((ledger.sol_received - 2.25).abs() < 1e-9);
        assert!((ledger.profit_sol() - 1.0).abs() < 1e-9);
        assert_eq!(ledger.swap_count, 4);
        assert_eq!(ledger.mints.len(), 2);
        assert_eq!(ledger.profitable_trades, 2);
        assert_eq!(ledger.losing_trades, 2);
        assert_eq!(ledger.last_trade_at, Some(40));
    }

    #[test]
    fn test_deltas_inside_band_are_undecided() {
        let records = vec![trade("s1", 10, 0.0005, "MintA"), trade("s2", 20, -0.0009, "MintA")];
        let ledger = WalletLedger::from_transactions("Wallet1", &records);

        assert_eq!(ledger.swap_count, 2);
        assert_eq!(ledger.profitable_trades + ledger.losing_trades, 0);
        // Still accumulated into the totals
        assert!(ledger.sol_received > 0.0);
        assert!(ledger.sol_spent > 0.0);
    }

    #[test]
    fn test_failed_transactions_are_skipped() {
        let mut failed = trade("s1", 99, 5.0, "MintA");
        failed.failed = true;
        let ledger = WalletLedger::from_transactions("Wallet1", [&failed]);
        assert_eq!(ledger, WalletLedger::new("Wallet1"));
    }

    #[test]
    fn test_funding_source_first_large_transfer_wins() {
        let small = transfer_in("t0", "Wallet1", "Dust", LAMPORTS_PER_SOL / 20);
        let first = transfer_in("t1", "Wallet1", "FunderA", 2 * LAMPORTS_PER_SOL);
        let second = transfer_in("t2", "Wallet1", "FunderB", 5 * LAMPORTS_PER_SOL);
        let records = vec![small, first, trade("s1", 10, -1.0, "MintA"), second];

        let ledger = WalletLedger::from_transactions("Wallet1", &records);
        assert_eq!(ledger.funding_source.as_deref(), Some("FunderA"));
        // Transfers are not trades
        assert_eq!(ledger.swap_count, 1);
        assert!((ledger.sol_received).abs() < 1e-9);
    }

    #[test]
    fn test_funding_threshold_uses_raw_balance_increase() {
        // 0.099998 SOL arrives; adding the 5000 lamport fee back would clear 0.1
        let near = transfer_in("t0", "Wallet1", "Near", LAMPORTS_PER_SOL / 10 - 2_000);
        let ledger = WalletLedger::from_transactions("Wallet1", [&near]);
        assert!(ledger.funding_source.is_none());

        let over = transfer_in("t1", "Wallet1", "Over", LAMPORTS_PER_SOL / 10 + 1);
        let ledger = WalletLedger::from_transactions("Wallet1", [&near, &over]);
        assert_eq!(ledger.funding_source.as_deref(), Some("Over"));
    }

    #[test]
    fn test_swap_never_identifies_funding_source() {
        let big_win = trade("s1", 10, 3.0, "MintA");
        let ledger = WalletLedger::from_transactions("Wallet1", [&big_win]);
        assert!(ledger.funding_source.is_none());
    }

    #[test]
    fn test_record_without_balances_contributes_nothing() {
        let empty = crate::models::TransactionRecord {
            signature: "x".to_string(),
            ..Default::default()
        };
        let ledger = WalletLedger::from_transactions("Wallet1", [&empty]);
        assert_eq!(ledger, WalletLedger::new("Wallet1"));
    }
}
