pub mod cluster;
pub mod discovery;
pub mod ledger;
pub mod monitor;
pub mod scorer;

// Re-export main types
pub use discovery::{DiscoveryConfig, DiscoveryOrchestrator, DiscoveryReport};
pub use ledger::WalletLedger;
pub use monitor::{MonitorConfig, PollOutcome, SweepStats, WalletMonitor};
pub use scorer::{Classification, ScoringThresholds, WalletMetrics};
