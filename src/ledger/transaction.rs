//! Ledger entry payload construction

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;
use crate::utils::{validate_payee, validate_reference};

/// Builder for the payload posted to the ledger
#[derive(Debug)]
pub struct TransactionBuilder {
    transaction: NewLedgerTransaction,
}

impl TransactionBuilder {
    /// Create a new builder with an empty memo, note and reference
    pub fn new(payee: String, amount: BigDecimal, date: NaiveDate) -> Self {
        Self {
            transaction: NewLedgerTransaction {
                payee,
                amount,
                date,
                is_transfer: false,
                memo: String::new(),
                cheque_number: String::new(),
                note: String::new(),
            },
        }
    }

    /// Start from a classified wallet record
    pub fn from_candidate(candidate: &LedgerEntryCandidate) -> Self {
        Self::new(
            candidate.payee.clone(),
            candidate.amount.clone(),
            candidate.date,
        )
        .transfer(candidate.is_transfer)
        .memo(candidate.memo.clone())
        .reference(candidate.dedup_key.reference())
    }

    pub fn transfer(mut self, is_transfer: bool) -> Self {
        self.transaction.is_transfer = is_transfer;
        self
    }

    pub fn memo(mut self, memo: String) -> Self {
        self.transaction.memo = memo;
        self
    }

    /// Set the dedup reference (stored as the cheque number)
    pub fn reference(mut self, reference: String) -> Self {
        self.transaction.cheque_number = reference;
        self
    }

    pub fn note(mut self, note: String) -> Self {
        self.transaction.note = note;
        self
    }

    /// Validate and build the payload
    pub fn build(self) -> SyncResult<NewLedgerTransaction> {
        validate_payee(&self.transaction.payee)?;
        validate_reference(&self.transaction.cheque_number)?;
        Ok(self.transaction)
    }
}
