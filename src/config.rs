//! Run configuration

use crate::types::*;
use crate::utils::validate_required;

/// Page size requested from the wallet history endpoint
pub const DEFAULT_PAGE_SIZE: u32 = 999;

/// Number of transactions fetched per run unless overridden
pub const DEFAULT_TRANSACTION_LIMIT: usize = 100;

/// Number of already-imported records tolerated before a run stops early
pub const DEFAULT_REPEAT_THRESHOLD: usize = 10;

pub const DEFAULT_ACCOUNT_NAME: &str = "ANA Pay";
pub const DEFAULT_INSTITUTION_NAME: &str = "ANA Pay";
pub const DEFAULT_CURRENCY_CODE: &str = "jpy";

/// Everything a synchronization run needs, passed explicitly to the engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub credentials: WalletCredentials,
    pub ledger_token: String,
    /// Stop paging once more than this many records have been fetched
    pub transaction_limit: usize,
    pub page_size: u32,
    /// Stop processing once more than this many records were already in the ledger.
    ///
    /// Only sound while the wallet returns its history in a stable, newest-first
    /// order: the first run of duplicates then marks the point where the ledger
    /// has caught up. If that ordering ever stops holding, set this to
    /// `usize::MAX` to force a full dedup pass.
    pub repeat_threshold: usize,
    pub account_name: String,
    pub institution_name: String,
    pub currency_code: String,
}

impl SyncConfig {
    /// Create a configuration with default limits and account names
    pub fn new(credentials: WalletCredentials, ledger_token: String) -> Self {
        Self {
            credentials,
            ledger_token,
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            account_name: DEFAULT_ACCOUNT_NAME.to_string(),
            institution_name: DEFAULT_INSTITUTION_NAME.to_string(),
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    pub fn with_transaction_limit(mut self, limit: usize) -> Self {
        self.transaction_limit = limit;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_repeat_threshold(mut self, threshold: usize) -> Self {
        self.repeat_threshold = threshold;
        self
    }

    pub fn with_account_name(mut self, name: &str) -> Self {
        self.account_name = name.to_string();
        self
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> SyncResult<()> {
        validate_required(&self.credentials.wallet_id, "Wallet username")?;
        validate_required(&self.credentials.device_id, "Wallet password")?;
        validate_required(&self.ledger_token, "Ledger API token")?;
        validate_required(&self.account_name, "Account name")?;
        validate_required(&self.institution_name, "Institution name")?;

        if self.page_size == 0 {
            return Err(SyncError::Config(
                "Page size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
