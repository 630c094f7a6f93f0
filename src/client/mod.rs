//! HTTP implementations of the wallet and ledger collaborators

pub mod ledger;
pub mod wallet;

pub use ledger::HttpLedgerClient;
pub use wallet::HttpWalletClient;
