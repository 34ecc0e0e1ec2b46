pub mod alert;
pub mod token;
pub mod transaction;
pub mod wallet;

// Re-export commonly used types
pub use alert::{Alert, AlertAction};
pub use token::{SignatureInfo, TokenMarketData};
pub use transaction::{TokenBalance, TransactionRecord};
pub use wallet::{QualifyingProfile, TrackedWallet, WalletCluster, WalletScore, WalletSource};
