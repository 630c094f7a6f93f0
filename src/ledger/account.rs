//! Ledger account bootstrap

use tracing::info;

use crate::traits::*;
use crate::types::*;

/// Account manager resolving the ledger account that mirrors the wallet
pub struct AccountManager<'a, L: LedgerService + ?Sized> {
    ledger: &'a L,
    institution_name: String,
    currency_code: String,
}

impl<'a, L: LedgerService + ?Sized> AccountManager<'a, L> {
    /// Create a new account manager
    pub fn new(ledger: &'a L, institution_name: String, currency_code: String) -> Self {
        Self {
            ledger,
            institution_name,
            currency_code,
        }
    }

    /// Find the institution by name, creating it if it does not exist yet
    pub async fn find_or_create_institution(&self, user_id: i64) -> SyncResult<Institution> {
        if let Some(institution) = self
            .ledger
            .find_institution_by_name(user_id, &self.institution_name)
            .await?
        {
            return Ok(institution);
        }

        info!(name = %self.institution_name, "creating institution");
        self.ledger
            .create_institution(user_id, &self.institution_name, &self.currency_code)
            .await
    }

    /// Find the account by name, creating it (and its institution) if it does not exist yet
    pub async fn find_or_create_account(
        &self,
        user_id: i64,
        account_name: &str,
    ) -> SyncResult<LedgerAccount> {
        if let Some(account) = self.ledger.find_account_by_name(user_id, account_name).await? {
            return Ok(account);
        }

        let institution = self.find_or_create_institution(user_id).await?;

        info!(name = %account_name, institution = institution.id, "creating account");
        self.ledger
            .create_account(
                user_id,
                institution.id,
                account_name,
                &self.currency_code,
                AccountType::Credits,
            )
            .await
    }

    /// Same as [`find_or_create_account`](Self::find_or_create_account), but any
    /// failure is reported as a bootstrap error
    pub async fn resolve(&self, user_id: i64, account_name: &str) -> SyncResult<LedgerAccount> {
        self.find_or_create_account(user_id, account_name)
            .await
            .map_err(|e| match e {
                SyncError::AccountBootstrap(_) => e,
                other => SyncError::AccountBootstrap(format!(
                    "could not find or create account '{}': {}",
                    account_name, other
                )),
            })
    }
}
