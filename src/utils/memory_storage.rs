//! In-memory wallet and ledger implementations for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory wallet serving a fixed history, newest first
#[derive(Debug, Clone)]
pub struct MemoryWallet {
    history: Arc<RwLock<Vec<RawWalletTransaction>>>,
    balance: Arc<RwLock<String>>,
    credentials: Option<WalletCredentials>,
    failing_page: Arc<RwLock<Option<u32>>>,
    page_requests: Arc<RwLock<Vec<(u32, u32)>>>,
}

impl MemoryWallet {
    /// Create a new wallet with the given history and reported balance
    pub fn new(history: Vec<RawWalletTransaction>, balance: &str) -> Self {
        Self {
            history: Arc::new(RwLock::new(history)),
            balance: Arc::new(RwLock::new(balance.to_string())),
            credentials: None,
            failing_page: Arc::new(RwLock::new(None)),
            page_requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Only accept these credentials
    pub fn with_credentials(mut self, credentials: WalletCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Make a page fetch fail
    pub fn fail_page(&self, page_number: u32) {
        *self.failing_page.write().unwrap() = Some(page_number);
    }

    pub fn set_balance(&self, balance: &str) {
        *self.balance.write().unwrap() = balance.to_string();
    }

    /// Prepend newer records to the history
    pub fn push_newer(&self, records: Vec<RawWalletTransaction>) {
        let mut history = self.history.write().unwrap();
        let older = std::mem::replace(&mut *history, records);
        history.extend(older);
    }

    /// `(page_number, page_size)` of every page request, in order
    pub fn page_requests(&self) -> Vec<(u32, u32)> {
        self.page_requests.read().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MemoryWallet {
    async fn authenticate(&self, credentials: &WalletCredentials) -> SyncResult<WalletSession> {
        if let Some(expected) = &self.credentials {
            if expected != credentials {
                return Err(SyncError::Auth("invalid wallet credentials".to_string()));
            }
        }

        Ok(WalletSession {
            access_token: format!("token-{}", credentials.wallet_id),
        })
    }

    async fn fetch_account_balance(&self, _session: &WalletSession) -> SyncResult<String> {
        Ok(self.balance.read().unwrap().clone())
    }

    async fn fetch_transaction_page(
        &self,
        _session: &WalletSession,
        page_number: u32,
        page_size: u32,
    ) -> SyncResult<Vec<RawWalletTransaction>> {
        self.page_requests
            .write()
            .unwrap()
            .push((page_number, page_size));

        if *self.failing_page.read().unwrap() == Some(page_number) {
            return Err(SyncError::Wallet(format!(
                "page {} could not be fetched",
                page_number
            )));
        }

        let history = self.history.read().unwrap();
        let start = (page_number.saturating_sub(1) as usize).saturating_mul(page_size as usize);
        Ok(history
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: i64,
    institutions: Vec<(i64, Institution)>,
    accounts: Vec<(i64, LedgerAccount)>,
    entries: HashMap<i64, Vec<LedgerEntry>>,
    starting_balance_updates: Vec<BalanceCorrection>,
    failing_searches: HashSet<String>,
    failing_creates: HashSet<String>,
    fail_account_lookups: bool,
    search_calls: usize,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Starting balance plus every entry dated after the starting balance date
    fn current_balance(&self, account: &TransactionAccount) -> BigDecimal {
        let posted: BigDecimal = self
            .entries
            .get(&account.id)
            .into_iter()
            .flatten()
            .filter(|entry| {
                account
                    .starting_balance_date
                    .is_none_or(|since| entry.date > since)
            })
            .map(|entry| &entry.amount)
            .sum();
        &account.starting_balance + posted
    }

    fn refreshed(&self, account: &LedgerAccount) -> LedgerAccount {
        let mut account = account.clone();
        account.current_balance = self.current_balance(&account.primary_transaction_account);
        account
    }
}

/// In-memory ledger for testing and development
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    user_id: i64,
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    /// Create an empty ledger owned by user 1
    pub fn new() -> Self {
        Self {
            user_id: 1,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Seed an account (and its institution) with a starting balance
    pub fn with_account(self, name: &str, starting_balance: BigDecimal) -> Self {
        {
            let mut state = self.state.write().unwrap();
            let institution = Institution {
                id: state.next_id(),
                title: name.to_string(),
                currency_code: "jpy".to_string(),
            };
            let transaction_account = TransactionAccount {
                id: state.next_id(),
                name: name.to_string(),
                starting_balance: starting_balance.clone(),
                starting_balance_date: None,
                institution: institution.clone(),
            };
            let account = LedgerAccount {
                id: state.next_id(),
                title: name.to_string(),
                currency_code: "jpy".to_string(),
                account_type: AccountType::Credits,
                current_balance: starting_balance,
                primary_transaction_account: transaction_account.clone(),
                transaction_accounts: vec![transaction_account],
            };
            let user_id = self.user_id;
            state.institutions.push((user_id, institution));
            state.accounts.push((user_id, account));
        }
        self
    }

    /// Get a seeded or created account by name
    pub fn account(&self, name: &str) -> Option<LedgerAccount> {
        let state = self.state.read().unwrap();
        state
            .accounts
            .iter()
            .find(|(_, account)| account.title == name)
            .map(|(_, account)| state.refreshed(account))
    }

    /// Insert an entry directly, as if created by an earlier run
    pub fn seed_entry(&self, transaction_account_id: i64, mut entry: LedgerEntry) -> LedgerEntry {
        let mut state = self.state.write().unwrap();
        entry.id = state.next_id();
        state
            .entries
            .entry(transaction_account_id)
            .or_default()
            .push(entry.clone());
        entry
    }

    /// All entries of a transaction account, in creation order
    pub fn entries(&self, transaction_account_id: i64) -> Vec<LedgerEntry> {
        self.state
            .read()
            .unwrap()
            .entries
            .get(&transaction_account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn starting_balance_updates(&self) -> Vec<BalanceCorrection> {
        self.state.read().unwrap().starting_balance_updates.clone()
    }

    /// Make searches for this query fail
    pub fn fail_search_for(&self, query: &str) {
        self.state
            .write()
            .unwrap()
            .failing_searches
            .insert(query.to_string());
    }

    /// Make creation of the entry carrying this reference fail
    pub fn fail_create_for(&self, reference: &str) {
        self.state
            .write()
            .unwrap()
            .failing_creates
            .insert(reference.to_string());
    }

    pub fn fail_account_lookups(&self, fail: bool) {
        self.state.write().unwrap().fail_account_lookups = fail;
    }

    pub fn search_calls(&self) -> usize {
        self.state.read().unwrap().search_calls
    }

    pub fn institution_count(&self) -> usize {
        self.state.read().unwrap().institutions.len()
    }

    pub fn account_count(&self) -> usize {
        self.state.read().unwrap().accounts.len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerService for MemoryLedger {
    async fn current_user(&self) -> SyncResult<LedgerUser> {
        Ok(LedgerUser { id: self.user_id })
    }

    async fn find_account_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<LedgerAccount>> {
        let state = self.state.read().unwrap();
        if state.fail_account_lookups {
            return Err(SyncError::Ledger {
                status: Some(503),
                message: "account lookup unavailable".to_string(),
            });
        }

        Ok(state
            .accounts
            .iter()
            .find(|(owner, account)| *owner == user_id && account.title == name)
            .map(|(_, account)| state.refreshed(account)))
    }

    async fn find_institution_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<Institution>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .institutions
            .iter()
            .find(|(owner, institution)| *owner == user_id && institution.title == name)
            .map(|(_, institution)| institution.clone()))
    }

    async fn create_institution(
        &self,
        user_id: i64,
        name: &str,
        currency_code: &str,
    ) -> SyncResult<Institution> {
        let mut state = self.state.write().unwrap();
        let institution = Institution {
            id: state.next_id(),
            title: name.to_string(),
            currency_code: currency_code.to_string(),
        };
        state.institutions.push((user_id, institution.clone()));
        Ok(institution)
    }

    async fn create_account(
        &self,
        user_id: i64,
        institution_id: i64,
        name: &str,
        currency_code: &str,
        account_type: AccountType,
    ) -> SyncResult<LedgerAccount> {
        let mut state = self.state.write().unwrap();
        let institution = state
            .institutions
            .iter()
            .find(|(_, institution)| institution.id == institution_id)
            .map(|(_, institution)| institution.clone())
            .ok_or_else(|| SyncError::Ledger {
                status: Some(404),
                message: format!("institution {} not found", institution_id),
            })?;

        let transaction_account = TransactionAccount {
            id: state.next_id(),
            name: name.to_string(),
            starting_balance: BigDecimal::from(0),
            starting_balance_date: None,
            institution,
        };
        let account = LedgerAccount {
            id: state.next_id(),
            title: name.to_string(),
            currency_code: currency_code.to_string(),
            account_type,
            current_balance: BigDecimal::from(0),
            primary_transaction_account: transaction_account.clone(),
            transaction_accounts: vec![transaction_account],
        };
        state.accounts.push((user_id, account.clone()));
        Ok(account)
    }

    async fn search_transactions(
        &self,
        transaction_account_id: i64,
        date: NaiveDate,
        query: &str,
    ) -> SyncResult<Vec<LedgerEntry>> {
        let mut state = self.state.write().unwrap();
        state.search_calls += 1;

        if state.failing_searches.contains(query) {
            return Err(SyncError::Ledger {
                status: Some(500),
                message: format!("search for '{}' failed", query),
            });
        }

        let contains = |field: &Option<String>| field.as_deref().is_some_and(|v| v.contains(query));
        Ok(state
            .entries
            .get(&transaction_account_id)
            .into_iter()
            .flatten()
            .filter(|entry| entry.date == date)
            .filter(|entry| {
                entry.payee.contains(query) || contains(&entry.memo) || contains(&entry.cheque_number)
            })
            .cloned()
            .collect())
    }

    async fn create_transaction(
        &self,
        transaction_account_id: i64,
        transaction: &NewLedgerTransaction,
    ) -> SyncResult<LedgerEntry> {
        let mut state = self.state.write().unwrap();

        if state.failing_creates.contains(&transaction.cheque_number) {
            return Err(SyncError::Ledger {
                status: Some(422),
                message: format!("entry {} rejected", transaction.cheque_number),
            });
        }

        let known_account = state.accounts.iter().any(|(_, account)| {
            account
                .transaction_accounts
                .iter()
                .any(|t| t.id == transaction_account_id)
        });
        if !known_account {
            return Err(SyncError::Ledger {
                status: Some(404),
                message: format!("transaction account {} not found", transaction_account_id),
            });
        }

        let entry = LedgerEntry {
            id: state.next_id(),
            payee: transaction.payee.clone(),
            amount: transaction.amount.clone(),
            date: transaction.date,
            is_transfer: transaction.is_transfer,
            memo: Some(transaction.memo.clone()),
            cheque_number: Some(transaction.cheque_number.clone()),
            note: Some(transaction.note.clone()),
        };
        state
            .entries
            .entry(transaction_account_id)
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn update_starting_balance(
        &self,
        transaction_account_id: i64,
        institution_id: i64,
        balance: &BigDecimal,
        as_of: NaiveDate,
    ) -> SyncResult<TransactionAccount> {
        let mut state = self.state.write().unwrap();
        let mut updated = None;

        for (_, account) in state.accounts.iter_mut() {
            let targets = std::iter::once(&mut account.primary_transaction_account)
                .chain(account.transaction_accounts.iter_mut());
            for transaction_account in targets {
                if transaction_account.id == transaction_account_id {
                    transaction_account.starting_balance = balance.clone();
                    transaction_account.starting_balance_date = Some(as_of);
                    transaction_account.institution.id = institution_id;
                    updated = Some(transaction_account.clone());
                }
            }
        }

        let updated = updated.ok_or_else(|| SyncError::Ledger {
            status: Some(404),
            message: format!("transaction account {} not found", transaction_account_id),
        })?;

        state.starting_balance_updates.push(BalanceCorrection {
            starting_balance: balance.clone(),
            as_of,
        });
        Ok(updated)
    }
}
