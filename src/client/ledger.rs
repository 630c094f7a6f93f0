//! HTTP client for the PocketSmith-style ledger API

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::traits::LedgerService;
use crate::types::*;

// ── Constants ───────────────────────────────────────────────────────

const LEDGER_API_BASE: &str = "https://api.pocketsmith.com/v2";
const DEVELOPER_KEY_HEADER: &str = "X-Developer-Key";
const TIMEOUT_SECS: u64 = 30;

// ── Decimal helpers ─────────────────────────────────────────────────

/// Accept amounts sent either as JSON numbers or as strings; null means zero.
fn de_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(BigDecimal::from(0)),
        Some(Value::Number(n)) => BigDecimal::from_str(&n.to_string()).map_err(de::Error::custom),
        Some(Value::String(s)) => BigDecimal::from_str(s.trim()).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("expected a decimal, got {}", other))),
    }
}

fn decimal_json(value: &BigDecimal) -> Value {
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireInstitution {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    currency_code: String,
}

impl From<WireInstitution> for Institution {
    fn from(wire: WireInstitution) -> Self {
        Institution {
            id: wire.id,
            title: wire.title,
            currency_code: wire.currency_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTransactionAccount {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "de_decimal")]
    starting_balance: BigDecimal,
    #[serde(default)]
    starting_balance_date: Option<NaiveDate>,
    institution: WireInstitution,
}

impl From<WireTransactionAccount> for TransactionAccount {
    fn from(wire: WireTransactionAccount) -> Self {
        TransactionAccount {
            id: wire.id,
            name: wire.name,
            starting_balance: wire.starting_balance,
            starting_balance_date: wire.starting_balance_date,
            institution: wire.institution.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    currency_code: String,
    #[serde(rename = "type", default)]
    account_type: String,
    #[serde(default, deserialize_with = "de_decimal")]
    current_balance: BigDecimal,
    primary_transaction_account: WireTransactionAccount,
    #[serde(default)]
    transaction_accounts: Vec<WireTransactionAccount>,
}

fn parse_account_type(value: &str) -> AccountType {
    match value {
        "bank" => AccountType::Bank,
        "credits" => AccountType::Credits,
        "cards" => AccountType::Cards,
        _ => AccountType::Other,
    }
}

impl From<WireAccount> for LedgerAccount {
    fn from(wire: WireAccount) -> Self {
        LedgerAccount {
            id: wire.id,
            title: wire.title,
            currency_code: wire.currency_code,
            account_type: parse_account_type(&wire.account_type),
            current_balance: wire.current_balance,
            primary_transaction_account: wire.primary_transaction_account.into(),
            transaction_accounts: wire
                .transaction_accounts
                .into_iter()
                .map(TransactionAccount::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    id: i64,
    #[serde(default)]
    payee: String,
    #[serde(default, deserialize_with = "de_decimal")]
    amount: BigDecimal,
    date: NaiveDate,
    #[serde(default)]
    is_transfer: Option<bool>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    cheque_number: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

impl From<WireTransaction> for LedgerEntry {
    fn from(wire: WireTransaction) -> Self {
        LedgerEntry {
            id: wire.id,
            payee: wire.payee,
            amount: wire.amount,
            date: wire.date,
            is_transfer: wire.is_transfer.unwrap_or(false),
            memo: wire.memo,
            cheque_number: wire.cheque_number,
            note: wire.note,
        }
    }
}

/// Pull a readable message out of an error body
fn extract_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// ── Client ──────────────────────────────────────────────────────────

/// Ledger service backed by the PocketSmith REST API
pub struct HttpLedgerClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(token: String) -> SyncResult<Self> {
        Self::with_base_url(token, LEDGER_API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with the developer key and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> SyncResult<T> {
        let response = request
            .header(DEVELOPER_KEY_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Ledger {
                status: Some(status),
                message: extract_error(&body),
            });
        }

        response.json::<T>().await.map_err(|e| SyncError::Ledger {
            status: Some(status),
            message: format!("unexpected response body: {}", e),
        })
    }
}

#[async_trait]
impl LedgerService for HttpLedgerClient {
    async fn current_user(&self) -> SyncResult<LedgerUser> {
        let user: WireUser = self.send(self.http.get(self.url("/me"))).await?;
        Ok(LedgerUser { id: user.id })
    }

    async fn find_account_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<LedgerAccount>> {
        let url = self.url(&format!("/users/{}/accounts", user_id));
        let accounts: Vec<WireAccount> = self.send(self.http.get(url)).await?;
        Ok(accounts
            .into_iter()
            .find(|account| account.title == name)
            .map(LedgerAccount::from))
    }

    async fn find_institution_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> SyncResult<Option<Institution>> {
        let url = self.url(&format!("/users/{}/institutions", user_id));
        let institutions: Vec<WireInstitution> = self.send(self.http.get(url)).await?;
        Ok(institutions
            .into_iter()
            .find(|institution| institution.title == name)
            .map(Institution::from))
    }

    async fn create_institution(
        &self,
        user_id: i64,
        name: &str,
        currency_code: &str,
    ) -> SyncResult<Institution> {
        let url = self.url(&format!("/users/{}/institutions", user_id));
        let body = json!({ "title": name, "currency_code": currency_code });
        let institution: WireInstitution = self.send(self.http.post(url).json(&body)).await?;
        Ok(institution.into())
    }

    async fn create_account(
        &self,
        user_id: i64,
        institution_id: i64,
        name: &str,
        currency_code: &str,
        account_type: AccountType,
    ) -> SyncResult<LedgerAccount> {
        let url = self.url(&format!("/users/{}/accounts", user_id));
        let body = json!({
            "institution_id": institution_id,
            "title": name,
            "currency_code": currency_code,
            "type": account_type.as_str(),
        });
        let account: WireAccount = self.send(self.http.post(url).json(&body)).await?;
        Ok(account.into())
    }

    async fn search_transactions(
        &self,
        transaction_account_id: i64,
        date: NaiveDate,
        query: &str,
    ) -> SyncResult<Vec<LedgerEntry>> {
        let url = self.url(&format!(
            "/transaction_accounts/{}/transactions",
            transaction_account_id
        ));
        let day = date.format("%Y-%m-%d").to_string();
        let params = [
            ("start_date", day.as_str()),
            ("end_date", day.as_str()),
            ("search", query),
        ];
        let entries: Vec<WireTransaction> = self.send(self.http.get(url).query(&params)).await?;
        Ok(entries.into_iter().map(LedgerEntry::from).collect())
    }

    async fn create_transaction(
        &self,
        transaction_account_id: i64,
        transaction: &NewLedgerTransaction,
    ) -> SyncResult<LedgerEntry> {
        let url = self.url(&format!(
            "/transaction_accounts/{}/transactions",
            transaction_account_id
        ));
        let body = json!({
            "payee": transaction.payee,
            "amount": decimal_json(&transaction.amount),
            "date": transaction.date.format("%Y-%m-%d").to_string(),
            "is_transfer": transaction.is_transfer,
            "memo": transaction.memo,
            "cheque_number": transaction.cheque_number,
            "note": transaction.note,
        });
        let entry: WireTransaction = self.send(self.http.post(url).json(&body)).await?;
        Ok(entry.into())
    }

    async fn update_starting_balance(
        &self,
        transaction_account_id: i64,
        institution_id: i64,
        balance: &BigDecimal,
        as_of: NaiveDate,
    ) -> SyncResult<TransactionAccount> {
        let url = self.url(&format!("/transaction_accounts/{}", transaction_account_id));
        let body = json!({
            "institution_id": institution_id,
            "starting_balance": decimal_json(balance),
            "starting_balance_date": as_of.format("%Y-%m-%d").to_string(),
        });
        let account: WireTransactionAccount = self.send(self.http.put(url).json(&body)).await?;
        Ok(account.into())
    }
}
