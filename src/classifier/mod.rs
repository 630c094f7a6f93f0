//! Transaction classification
//!
//! Maps one raw wallet record to a [`LedgerEntryCandidate`]: signed amount,
//! payee, memo, transfer flag and dedup key. Classification is pure and only
//! fails on malformed timestamps or amounts.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use crate::types::*;
use crate::utils::sanitize_payee;

/// Layout of the wallet's sale timestamp
pub const SALE_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Deal-type code of a manual wallet charge
const DEAL_TYPE_TOP_UP: &str = "05";
/// Deal-type code of a provider cashback
const DEAL_TYPE_CASHBACK: &str = "06";
/// Delivery-kind codes that credit the wallet (refunds and reversals)
const INBOUND_DEL_KBN: [&str; 3] = ["02", "07", "08"];

/// Resolve the transaction kind. Deal-type codes take priority over description-type codes.
pub fn transaction_kind(tx: &RawWalletTransaction) -> TransactionKind {
    match (tx.deal_type.as_str(), tx.description_type.as_str()) {
        (DEAL_TYPE_TOP_UP, _) => TransactionKind::TopUp,
        (DEAL_TYPE_CASHBACK, _) => TransactionKind::Cashback,
        (_, "3001") => TransactionKind::CreditCard,
        (_, "3006") => TransactionKind::MobileWalletTap,
        (_, "3007") => TransactionKind::Cashback,
        (_, "3009") => TransactionKind::AutoTopUp,
        (_, "1017") => TransactionKind::VirtualPrepaidCard,
        (_, "1018") => TransactionKind::ContactlessCard,
        (_, "1019") => TransactionKind::ContactlessId,
        _ => TransactionKind::Unknown,
    }
}

/// Whether the record adds money to the wallet
pub fn is_inbound(tx: &RawWalletTransaction) -> bool {
    tx.deal_type == DEAL_TYPE_TOP_UP
        || tx.deal_type == DEAL_TYPE_CASHBACK
        || INBOUND_DEL_KBN.contains(&tx.del_kbn.as_str())
}

/// Derive the signed amount: negative for spend, positive for money entering the wallet
pub fn signed_amount(tx: &RawWalletTransaction) -> Result<BigDecimal, ClassifyError> {
    let raw = tx.amount.trim();
    if raw.is_empty() {
        return Ok(BigDecimal::from(0));
    }

    let magnitude = BigDecimal::from_str(raw).map_err(|_| ClassifyError::InvalidAmount {
        value: tx.amount.clone(),
    })?;

    if is_inbound(tx) {
        Ok(magnitude)
    } else {
        Ok(-magnitude)
    }
}

/// Parse the calendar date out of a `YYYYMMDDHHMMSS` timestamp
pub fn parse_sale_date(value: &str) -> Result<NaiveDate, ClassifyError> {
    NaiveDateTime::parse_from_str(value, SALE_DATETIME_FORMAT)
        .map(|datetime| datetime.date())
        .map_err(|_| ClassifyError::InvalidDate {
            value: value.to_string(),
        })
}

/// Classify a raw wallet record into a ledger entry candidate
pub fn classify(tx: &RawWalletTransaction) -> Result<LedgerEntryCandidate, ClassifyError> {
    let kind = transaction_kind(tx);
    let display_text = kind.display_text();

    let shop_name = tx.shop_name.trim();
    let name = if shop_name.is_empty() {
        display_text
    } else {
        shop_name
    };

    let date = parse_sale_date(&tx.sale_datetime)?;
    let amount = signed_amount(tx)?;
    let settlement_no = tx.wallet_settlement_no.trim();

    Ok(LedgerEntryCandidate {
        amount,
        payee: sanitize_payee(name),
        is_transfer: kind.is_transfer(),
        date,
        memo: format!("{} {} {}", name, settlement_no, display_text),
        kind,
        dedup_key: DedupKey {
            settlement_no: settlement_no.to_string(),
            settlement_sub_no: tx.wallet_settlement_sub_no.trim().to_string(),
            date,
        },
    })
}
