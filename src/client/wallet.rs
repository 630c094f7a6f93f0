//! HTTP client for the prepaid wallet API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::WalletProvider;
use crate::types::*;

// ── Constants ───────────────────────────────────────────────────────

const WALLET_API_BASE: &str = "https://teikei1.api.mkpst.com";
const USER_AGENT: &str =
    "ANAMileage/4.31.0 (jp.co.ana.anamile; build:4; iOS 18.1.0) Alamofire/5.9.1";
const LANGUAGES: &str = "ja-JP;q=1.0, en-AU;q=0.9, de-JP;q=0.8";
const TIMEOUT_SECS: u64 = 30;

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    ana_wallet_id: &'a str,
    device_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccountInfo {
    balance: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoryResponse {
    history: Vec<RawWalletTransaction>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Wallet provider backed by the mobile app's HTTP API
pub struct HttpWalletClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWalletClient {
    pub fn new() -> SyncResult<Self> {
        Self::with_base_url(WALLET_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGES));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET an authenticated endpoint and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &WalletSession,
        path: &str,
        query: &[(&str, String)],
    ) -> SyncResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SyncError::Auth(format!("{} rejected the session ({})", path, status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Wallet(format!(
                "{} failed ({}): {}",
                path,
                status,
                body.trim()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::Wallet(format!("{} returned an unexpected body: {}", path, e)))
    }
}

#[async_trait]
impl WalletProvider for HttpWalletClient {
    async fn authenticate(&self, credentials: &WalletCredentials) -> SyncResult<WalletSession> {
        let url = format!("{}/ana/accounts/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest {
                ana_wallet_id: &credentials.wallet_id,
                device_id: &credentials.device_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Auth(format!("login rejected ({})", status)));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("unexpected login response: {}", e)))?;

        if login.access_token.is_empty() {
            return Err(SyncError::Auth(
                "login response did not contain an access token".to_string(),
            ));
        }

        Ok(WalletSession {
            access_token: login.access_token,
        })
    }

    async fn fetch_account_balance(&self, session: &WalletSession) -> SyncResult<String> {
        let query = [
            ("balanceReferenceFlag", "1".to_string()),
            ("nfcStatusReferenceFlag", "1".to_string()),
        ];
        let info: AccountInfo = self.get_json(session, "/accounts", &query).await?;
        debug!(balance = %info.balance, "fetched wallet balance");
        Ok(info.balance)
    }

    async fn fetch_transaction_page(
        &self,
        session: &WalletSession,
        page_number: u32,
        page_size: u32,
    ) -> SyncResult<Vec<RawWalletTransaction>> {
        let query = [
            ("pageSize", page_size.to_string()),
            ("pageNumber", page_number.max(1).to_string()),
            ("historyType", String::new()),
            ("settlementType", String::new()),
        ];
        let response: HistoryResponse = self.get_json(session, "/salesDetails", &query).await?;
        Ok(response.history)
    }
}
