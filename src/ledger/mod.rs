//! Ledger module containing account bootstrap and entry construction

pub mod account;
pub mod transaction;

pub use account::*;
pub use transaction::*;
