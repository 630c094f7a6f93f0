//! Core types and data structures for wallet-to-ledger synchronization

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single history record as returned by the wallet provider.
///
/// Every field arrives as a string; missing fields deserialize to empty strings.
/// Example payload:
///
/// ```json
/// {
///   "saleDatetime": "20241223011207",
///   "settlementType": "",
///   "dealType": "05",
///   "delKbn": "01",
///   "descriptionType": "3009",
///   "shopName": "",
///   "amount": "5000",
///   "walletSettlementNo": "23123401120741221241",
///   "walletSettlementSubNo": "01",
///   "pointConversionAmount": ""
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawWalletTransaction {
    /// Sale timestamp in `YYYYMMDDHHMMSS` layout
    pub sale_datetime: String,
    pub settlement_type: String,
    /// Deal-type code ("05" top-up, "06" cashback, ...)
    pub deal_type: String,
    /// Delivery/cashback-kind code
    pub del_kbn: String,
    /// Description-type code ("3001" credit card, "1018" contactless card, ...)
    pub description_type: String,
    pub shop_name: String,
    /// Unsigned decimal amount; empty means zero
    pub amount: String,
    pub wallet_settlement_no: String,
    pub wallet_settlement_sub_no: String,
    pub point_conversion_amount: String,
}

/// Credentials used to open a wallet session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalletCredentials {
    pub wallet_id: String,
    pub device_id: String,
}

/// An authenticated wallet session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub access_token: String,
}

/// Normalized classification of a wallet record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Manual wallet charge from the funding source
    TopUp,
    /// Cashback credited by the provider
    Cashback,
    CreditCard,
    MobileWalletTap,
    /// Automatic charge triggered by a low balance
    AutoTopUp,
    VirtualPrepaidCard,
    ContactlessCard,
    ContactlessId,
    Unknown,
}

impl TransactionKind {
    /// Human-readable text used for the memo and as the fallback payee
    pub fn display_text(&self) -> &'static str {
        match self {
            TransactionKind::TopUp => "top-up",
            TransactionKind::Cashback => "cashback",
            TransactionKind::CreditCard => "credit card",
            TransactionKind::MobileWalletTap => "mobile-wallet tap-to-pay",
            TransactionKind::AutoTopUp => "auto top-up",
            TransactionKind::VirtualPrepaidCard => "virtual prepaid card",
            TransactionKind::ContactlessCard => "contactless card payment",
            TransactionKind::ContactlessId => "contactless ID payment",
            TransactionKind::Unknown => "unknown transaction type",
        }
    }

    /// Whether the record moves money between the wallet and its funding source
    pub fn is_transfer(&self) -> bool {
        matches!(self, TransactionKind::TopUp | TransactionKind::AutoTopUp)
    }
}

/// Key used to find a previously imported ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub settlement_no: String,
    pub settlement_sub_no: String,
    pub date: NaiveDate,
}

impl DedupKey {
    /// Reference string written to the ledger entry's cheque number field
    pub fn reference(&self) -> String {
        if self.settlement_sub_no.is_empty() {
            self.settlement_no.clone()
        } else {
            format!("{}-{}", self.settlement_no, self.settlement_sub_no)
        }
    }

    /// Entries written before sub-numbers were part of the reference only carry
    /// the bare settlement number. They can only stand for the first sub-record.
    fn accepts_legacy(&self) -> bool {
        self.settlement_sub_no.is_empty() || self.settlement_sub_no == "01"
    }

    /// Check whether an existing ledger entry records the same wallet transaction
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if entry.date != self.date || self.settlement_no.is_empty() {
            return false;
        }

        match entry.cheque_number.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => {
                reference == self.reference()
                    || (reference == self.settlement_no && self.accepts_legacy())
            }
            _ => {
                self.accepts_legacy()
                    && entry
                        .memo
                        .as_deref()
                        .is_some_and(|memo| memo.contains(&self.settlement_no))
            }
        }
    }
}

/// Ledger entry derived from exactly one wallet record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryCandidate {
    /// Signed amount: positive when money enters the wallet
    pub amount: BigDecimal,
    pub payee: String,
    pub is_transfer: bool,
    pub date: NaiveDate,
    pub memo: String,
    pub kind: TransactionKind,
    pub dedup_key: DedupKey,
}

/// Ledger user owning the synced account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUser {
    pub id: i64,
}

/// Financial institution as known by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: i64,
    pub title: String,
    pub currency_code: String,
}

/// Kind of ledger account created for the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Bank,
    Credits,
    Cards,
    Other,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Bank => "bank",
            AccountType::Credits => "credits",
            AccountType::Cards => "cards",
            AccountType::Other => "other",
        }
    }
}

/// Transaction account that entries are posted into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAccount {
    pub id: i64,
    pub name: String,
    pub starting_balance: BigDecimal,
    pub starting_balance_date: Option<NaiveDate>,
    pub institution: Institution,
}

/// Ledger account mirroring the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: i64,
    pub title: String,
    pub currency_code: String,
    pub account_type: AccountType,
    /// Balance including every posted entry
    pub current_balance: BigDecimal,
    pub primary_transaction_account: TransactionAccount,
    pub transaction_accounts: Vec<TransactionAccount>,
}

/// Entry as stored by the ledger service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub payee: String,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub is_transfer: bool,
    pub memo: Option<String>,
    pub cheque_number: Option<String>,
    pub note: Option<String>,
}

/// Payload for creating a ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerTransaction {
    pub payee: String,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub is_transfer: bool,
    pub memo: String,
    pub cheque_number: String,
    pub note: String,
}

/// Starting-balance reset issued at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceCorrection {
    pub starting_balance: BigDecimal,
    pub as_of: NaiveDate,
}

/// Summary of one synchronization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Records pulled from the wallet history
    pub fetched: usize,
    /// Entries newly created in the ledger
    pub created: usize,
    /// Records already present in the ledger
    pub already_existing: usize,
    /// Records that could not be classified or carry no settlement reference
    pub skipped_invalid: usize,
    pub failed_lookups: usize,
    pub failed_creates: usize,
    /// Whether processing stopped on the repeat threshold
    pub stopped_early: bool,
    pub wallet_balance: BigDecimal,
    /// Ledger balance observed before any correction
    pub ledger_balance: BigDecimal,
    pub balance_correction: Option<BalanceCorrection>,
}

impl RunReport {
    pub(crate) fn new(fetched: usize) -> Self {
        Self {
            fetched,
            created: 0,
            already_existing: 0,
            skipped_invalid: 0,
            failed_lookups: 0,
            failed_creates: 0,
            stopped_early: false,
            wallet_balance: BigDecimal::from(0),
            ledger_balance: BigDecimal::from(0),
            balance_correction: None,
        }
    }
}

/// Per-record classification failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("Invalid sale timestamp: {value:?}")]
    InvalidDate { value: String },
    #[error("Invalid amount: {value:?}")]
    InvalidAmount { value: String },
}

/// Errors that can occur during synchronization
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Wallet authentication failed: {0}")]
    Auth(String),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Ledger error (status {status:?}): {message}")]
    Ledger {
        status: Option<u16>,
        message: String,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid wallet balance: {0:?}")]
    InvalidBalance(String),
    #[error("Account bootstrap failed: {0}")]
    AccountBootstrap(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
