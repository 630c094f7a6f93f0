//! Reconciliation engine
//!
//! Drives one synchronization run:
//!
//! 1. **Bootstrap**: resolve the ledger account, open a wallet session and
//!    read the wallet balance.
//! 2. **Fetch**: page through the wallet history until an empty page or the
//!    configured transaction limit.
//! 3. **Reconcile**: classify each record in fetch order, skip records the
//!    ledger already holds and create the rest.
//! 4. **Balance correction**: reset the ledger's starting balance when the
//!    ledger has drifted above the wallet balance.
//!
//! Only bootstrap, fetch and balance failures abort the run. Per-record
//! failures are logged, counted in the [`RunReport`] and skipped.
//!
//! Records are processed strictly one at a time. The repeat threshold relies
//! on the wallet returning its history in a stable, newest-first order, so the
//! order records are visited in must never change.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::config::SyncConfig;
use crate::ledger::{AccountManager, TransactionBuilder};
use crate::traits::*;
use crate::types::*;

/// Outcome of reconciling a single wallet record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    AlreadyExists,
    InvalidRecord,
    LookupFailed,
    CreateFailed,
}

/// Synchronizes a wallet into a ledger account
pub struct ReconciliationEngine<W: WalletProvider, L: LedgerService> {
    config: SyncConfig,
    wallet: W,
    ledger: L,
    today: Option<NaiveDate>,
}

impl<W: WalletProvider, L: LedgerService> ReconciliationEngine<W, L> {
    /// Create a new engine for the given configuration and collaborators
    pub fn new(config: SyncConfig, wallet: W, ledger: L) -> Self {
        Self {
            config,
            wallet,
            ledger,
            today: None,
        }
    }

    /// Pin the date used for balance corrections instead of the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn account_manager(&self) -> AccountManager<'_, L> {
        AccountManager::new(
            &self.ledger,
            self.config.institution_name.clone(),
            self.config.currency_code.clone(),
        )
    }

    /// Run a full synchronization
    pub async fn run(&self) -> SyncResult<RunReport> {
        self.config.validate()?;

        let user = self.ledger.current_user().await?;
        let account = self
            .account_manager()
            .resolve(user.id, &self.config.account_name)
            .await?;

        let session = self.wallet.authenticate(&self.config.credentials).await?;
        let wallet_balance = self.wallet.fetch_account_balance(&session).await?;

        let records = self.fetch_history(&session).await?;
        info!("Found {} transactions", records.len());

        let mut report = RunReport::new(records.len());
        self.reconcile(&account, &records, &mut report).await;

        info!("Checking balance...");
        let account = self
            .account_manager()
            .resolve(user.id, &self.config.account_name)
            .await?;
        self.correct_balance(&account, &wallet_balance, &mut report)
            .await?;

        info!(
            created = report.created,
            already_existing = report.already_existing,
            skipped_invalid = report.skipped_invalid,
            failed_lookups = report.failed_lookups,
            failed_creates = report.failed_creates,
            stopped_early = report.stopped_early,
            "synchronization finished"
        );

        Ok(report)
    }

    /// Page through the wallet history.
    ///
    /// Stops on the first empty page, or as soon as more records than the
    /// transaction limit have been collected. The last page is kept whole.
    /// Records are returned in the wallet's order, newest first, which the
    /// repeat threshold in [`reconcile`](Self::reconcile) relies on.
    pub async fn fetch_history(
        &self,
        session: &WalletSession,
    ) -> SyncResult<Vec<RawWalletTransaction>> {
        let mut records = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self
                .wallet
                .fetch_transaction_page(session, page_number, self.config.page_size)
                .await?;
            debug!(page = page_number, count = page.len(), "fetched wallet page");

            if page.is_empty() {
                break;
            }

            records.extend(page);
            if records.len() > self.config.transaction_limit {
                break;
            }

            page_number += 1;
        }

        Ok(records)
    }

    /// Reconcile fetched records, in order, against the ledger account
    pub async fn reconcile(
        &self,
        account: &LedgerAccount,
        records: &[RawWalletTransaction],
        report: &mut RunReport,
    ) {
        let total = records.len();
        let mut repeated_existing = 0usize;

        for (index, record) in records.iter().enumerate() {
            if repeated_existing > self.config.repeat_threshold {
                info!("Too many repeated existing transactions, stopping");
                report.stopped_early = true;
                break;
            }

            match self.reconcile_record(account, record, index + 1, total).await {
                RecordOutcome::Created => report.created += 1,
                RecordOutcome::AlreadyExists => {
                    repeated_existing += 1;
                    report.already_existing += 1;
                }
                RecordOutcome::InvalidRecord => report.skipped_invalid += 1,
                RecordOutcome::LookupFailed => report.failed_lookups += 1,
                RecordOutcome::CreateFailed => report.failed_creates += 1,
            }
        }
    }

    /// Classify one record and create it unless the ledger already holds it
    pub async fn reconcile_record(
        &self,
        account: &LedgerAccount,
        record: &RawWalletTransaction,
        position: usize,
        total: usize,
    ) -> RecordOutcome {
        let candidate = match classify(record) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(
                    settlement_no = %record.wallet_settlement_no,
                    "Skipping transaction: {}", e
                );
                return RecordOutcome::InvalidRecord;
            }
        };

        let transaction_account_id = account.primary_transaction_account.id;

        match self.find_existing(transaction_account_id, &candidate).await {
            Ok(Some(existing)) => {
                debug!(
                    entry = existing.id,
                    "Found transaction already, won't add it again: {}", candidate.payee
                );
                return RecordOutcome::AlreadyExists;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    settlement_no = %candidate.dedup_key.settlement_no,
                    "Error searching for transaction: {}", e
                );
                return RecordOutcome::LookupFailed;
            }
        }

        let transaction = match TransactionBuilder::from_candidate(&candidate).build() {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(
                    settlement_no = %candidate.dedup_key.settlement_no,
                    "Skipping transaction: {}", e
                );
                return RecordOutcome::InvalidRecord;
            }
        };

        info!(
            "[{}/{}] Creating transaction: {} {} {} transfer={}",
            position,
            total,
            transaction.payee,
            transaction.amount,
            transaction.date,
            transaction.is_transfer
        );

        match self
            .ledger
            .create_transaction(transaction_account_id, &transaction)
            .await
        {
            Ok(_) => RecordOutcome::Created,
            Err(e) => {
                warn!(
                    settlement_no = %candidate.dedup_key.settlement_no,
                    "Error creating transaction: {}", e
                );
                RecordOutcome::CreateFailed
            }
        }
    }

    /// Look up a ledger entry recording the same wallet transaction
    pub async fn find_existing(
        &self,
        transaction_account_id: i64,
        candidate: &LedgerEntryCandidate,
    ) -> SyncResult<Option<LedgerEntry>> {
        let key = &candidate.dedup_key;
        let entries = self
            .ledger
            .search_transactions(transaction_account_id, key.date, &key.settlement_no)
            .await?;

        Ok(entries.into_iter().find(|entry| key.matches(entry)))
    }

    /// Reset the ledger's starting balance when it runs ahead of the wallet
    pub async fn correct_balance(
        &self,
        account: &LedgerAccount,
        wallet_balance: &str,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        let wallet_balance = parse_balance(wallet_balance)?;
        let ledger_balance = account.current_balance.clone();

        info!("Wallet balance {}", wallet_balance);
        info!("Ledger balance {}", ledger_balance);

        report.wallet_balance = wallet_balance.clone();
        report.ledger_balance = ledger_balance.clone();

        if wallet_balance >= ledger_balance {
            info!("No balance update needed at this time.");
            return Ok(());
        }

        info!("Wallet balance is less than ledger balance, updating starting balance");
        let transaction_account = &account.primary_transaction_account;
        let as_of = self.today();
        let updated = self
            .ledger
            .update_starting_balance(
                transaction_account.id,
                transaction_account.institution.id,
                &wallet_balance,
                as_of,
            )
            .await?;

        info!("Updated starting balance: {}", updated.starting_balance);
        report.balance_correction = Some(BalanceCorrection {
            starting_balance: wallet_balance,
            as_of,
        });

        Ok(())
    }
}

/// Parse the balance reported by the wallet
pub fn parse_balance(raw: &str) -> SyncResult<BigDecimal> {
    BigDecimal::from_str(raw.trim()).map_err(|_| SyncError::InvalidBalance(raw.to_string()))
}
