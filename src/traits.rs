//! Traits for the wallet and ledger collaborators
//!
//! The reconciliation engine only talks to the outside world through these two
//! traits, so it can run against the HTTP clients in production and against the
//! in-memory doubles in tests.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Source of wallet history and balance
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Open an authenticated session
    async fn authenticate(&self, credentials: &WalletCredentials) -> SyncResult<WalletSession>;

    /// Get the wallet balance exactly as reported by the provider
    async fn fetch_account_balance(&self, session: &WalletSession) -> SyncResult<String>;

    /// Fetch one page of transaction history (pages are 1-based).
    ///
    /// An empty page signals the end of the history.
    async fn fetch_transaction_page(
        &self,
        session: &WalletSession,
        page_number: u32,
        page_size: u32,
    ) -> SyncResult<Vec<RawWalletTransaction>>;
}

/// Personal-finance ledger that holds the synced account
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Get the user owning the API token
    async fn current_user(&self) -> SyncResult<LedgerUser>;

    /// Find an account by its title
    async fn find_account_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<LedgerAccount>>;

    /// Find an institution by its title
    async fn find_institution_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<Institution>>;

    async fn create_institution(
        &self,
        user_id: i64,
        name: &str,
        currency_code: &str,
    ) -> SyncResult<Institution>;

    async fn create_account(
        &self,
        user_id: i64,
        institution_id: i64,
        name: &str,
        currency_code: &str,
        account_type: AccountType,
    ) -> SyncResult<LedgerAccount>;

    /// Search entries of a transaction account posted on `date` whose text matches `query`
    async fn search_transactions(
        &self,
        transaction_account_id: i64,
        date: NaiveDate,
        query: &str,
    ) -> SyncResult<Vec<LedgerEntry>>;

    /// Post a new entry
    async fn create_transaction(
        &self,
        transaction_account_id: i64,
        transaction: &NewLedgerTransaction,
    ) -> SyncResult<LedgerEntry>;

    /// Reset the starting balance of a transaction account as of `as_of`
    async fn update_starting_balance(
        &self,
        transaction_account_id: i64,
        institution_id: i64,
        balance: &BigDecimal,
        as_of: NaiveDate,
    ) -> SyncResult<TransactionAccount>;
}
