//! # Wallet Ledger Sync
//!
//! Synchronizes transactions and balances from a prepaid mobile wallet into a
//! personal-finance ledger.
//!
//! ## Features
//!
//! - **Classification**: maps raw wallet records to signed ledger entries with payee, memo and transfer flag
//! - **Deduplication**: skips records the ledger already holds, keyed on settlement number, sub-number and date
//! - **Balance correction**: resets the ledger's starting balance when it drifts above the wallet balance
//! - **Collaborator abstraction**: wallet and ledger are reached through async traits, with HTTP and in-memory implementations
//!
//! ## Quick Start
//!
//! ```rust
//! use wallet_ledger_sync::utils::{MemoryLedger, MemoryWallet};
//! use wallet_ledger_sync::{ReconciliationEngine, SyncConfig, WalletCredentials};
//!
//! # async fn example() -> wallet_ledger_sync::SyncResult<()> {
//! let config = SyncConfig::new(
//!     WalletCredentials {
//!         wallet_id: "wallet".to_string(),
//!         device_id: "device".to_string(),
//!     },
//!     "ledger-token".to_string(),
//! );
//! let engine = ReconciliationEngine::new(config, MemoryWallet::new(vec![], "0"), MemoryLedger::new());
//! let report = engine.run().await?;
//! assert_eq!(report.created, 0);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use classifier::classify;
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
