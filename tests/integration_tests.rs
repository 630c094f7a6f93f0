//! Integration tests for wallet-ledger-sync

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use wallet_ledger_sync::{
    utils::{MemoryLedger, MemoryWallet},
    BalanceCorrection, LedgerEntry, RawWalletTransaction, ReconciliationEngine, SyncConfig,
    SyncError, WalletCredentials,
};

const ACCOUNT: &str = "ANA Pay";

fn credentials() -> WalletCredentials {
    WalletCredentials {
        wallet_id: "wallet-1".to_string(),
        device_id: "device-1".to_string(),
    }
}

fn config() -> SyncConfig {
    SyncConfig::new(credentials(), "token".to_string())
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn purchase(settlement_no: &str, amount: &str, day: u32) -> RawWalletTransaction {
    RawWalletTransaction {
        sale_datetime: format!("202412{:02}120000", day),
        deal_type: "01".to_string(),
        del_kbn: "01".to_string(),
        description_type: "1018".to_string(),
        shop_name: format!("Shop {}", settlement_no),
        amount: amount.to_string(),
        wallet_settlement_no: settlement_no.to_string(),
        wallet_settlement_sub_no: "01".to_string(),
        ..Default::default()
    }
}

/// The two records of the reference scenario: a top-up and a card purchase
fn scenario_records() -> Vec<RawWalletTransaction> {
    vec![
        RawWalletTransaction {
            amount: "5000".to_string(),
            deal_type: "05".to_string(),
            sale_datetime: "20241223011207".to_string(),
            wallet_settlement_no: "A1".to_string(),
            ..Default::default()
        },
        RawWalletTransaction {
            amount: "300".to_string(),
            description_type: "3001".to_string(),
            shop_name: "Shop B".to_string(),
            sale_datetime: "20241222090000".to_string(),
            wallet_settlement_no: "A2".to_string(),
            ..Default::default()
        },
    ]
}

fn engine(
    config: SyncConfig,
    wallet: &MemoryWallet,
    ledger: &MemoryLedger,
) -> ReconciliationEngine<MemoryWallet, MemoryLedger> {
    ReconciliationEngine::new(config, wallet.clone(), ledger.clone()).with_today(today())
}

fn primary_id(ledger: &MemoryLedger) -> i64 {
    ledger
        .account(ACCOUNT)
        .unwrap()
        .primary_transaction_account
        .id
}

#[tokio::test]
async fn test_scenario_creates_both_entries() {
    let wallet = MemoryWallet::new(scenario_records(), "4700");
    let ledger = MemoryLedger::new();

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.already_existing, 0);

    let entries = ledger.entries(primary_id(&ledger));
    assert_eq!(entries.len(), 2);

    let top_up = &entries[0];
    assert_eq!(top_up.amount, BigDecimal::from(5000));
    assert_eq!(top_up.date.to_string(), "2024-12-23");
    assert!(top_up.is_transfer);
    assert_eq!(top_up.payee, "top-up");
    assert_eq!(top_up.cheque_number.as_deref(), Some("A1"));

    let purchase = &entries[1];
    assert_eq!(purchase.amount, BigDecimal::from(-300));
    assert_eq!(purchase.date.to_string(), "2024-12-22");
    assert!(!purchase.is_transfer);
    assert_eq!(purchase.payee, "Shop B");
    assert_eq!(purchase.memo.as_deref(), Some("Shop B A2 credit card"));

    // 0 + 5000 - 300 equals the wallet balance, nothing to correct
    assert_eq!(report.ledger_balance, BigDecimal::from(4700));
    assert!(report.balance_correction.is_none());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let wallet = MemoryWallet::new(scenario_records(), "4700");
    let ledger = MemoryLedger::new();

    let first = engine(config(), &wallet, &ledger).run().await.unwrap();
    let second = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(first.created, 2);
    assert_eq!(second.created, 0);
    assert_eq!(second.already_existing, 2);
    assert_eq!(ledger.entries(primary_id(&ledger)).len(), 2);
}

#[tokio::test]
async fn test_only_new_records_are_created() {
    let wallet = MemoryWallet::new(vec![purchase("B1", "100", 1)], "0");
    let ledger = MemoryLedger::new();

    engine(config(), &wallet, &ledger).run().await.unwrap();
    wallet.push_newer(vec![purchase("B2", "250", 2)]);
    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.already_existing, 1);

    let entries = ledger.entries(primary_id(&ledger));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].cheque_number.as_deref(), Some("B2-01"));
}

#[tokio::test]
async fn test_stops_after_repeat_threshold() {
    let history: Vec<_> = (1..=11)
        .map(|i| purchase(&format!("D{:02}", i), "100", i))
        .collect();
    let wallet = MemoryWallet::new(history, "0");
    let ledger = MemoryLedger::new();
    engine(config(), &wallet, &ledger).run().await.unwrap();

    // Record 12 is new but sits behind eleven duplicates
    let mut with_older = wallet_records(&wallet).await;
    with_older.push(purchase("NEW", "999", 20));
    let wallet = MemoryWallet::new(with_older, "0");
    let searches_before = ledger.search_calls();

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.fetched, 12);
    assert_eq!(report.already_existing, 11);
    assert_eq!(report.created, 0);
    assert!(report.stopped_early);
    assert_eq!(ledger.search_calls() - searches_before, 11);
    assert_eq!(ledger.entries(primary_id(&ledger)).len(), 11);
}

#[tokio::test]
async fn test_ten_duplicates_do_not_stop_the_run() {
    let history: Vec<_> = (1..=10)
        .map(|i| purchase(&format!("E{:02}", i), "100", i))
        .collect();
    let wallet = MemoryWallet::new(history, "0");
    let ledger = MemoryLedger::new();
    engine(config(), &wallet, &ledger).run().await.unwrap();

    let mut records = wallet_records(&wallet).await;
    records.push(purchase("NEW", "999", 20));
    let wallet = MemoryWallet::new(records, "0");

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert!(!report.stopped_early);
    assert_eq!(report.already_existing, 10);
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_fetch_stops_once_limit_exceeded() {
    let history: Vec<_> = (1..=10)
        .map(|i| purchase(&format!("F{:02}", i), "100", i))
        .collect();
    let wallet = MemoryWallet::new(history, "0");
    let ledger = MemoryLedger::new();
    let config = config().with_page_size(3).with_transaction_limit(4);

    let report = engine(config, &wallet, &ledger).run().await.unwrap();

    // Page 2 pushes the count to 6 > 4, the page is kept whole
    assert_eq!(wallet.page_requests(), vec![(1, 3), (2, 3)]);
    assert_eq!(report.fetched, 6);
}

#[tokio::test]
async fn test_fetch_stops_on_empty_page() {
    let history: Vec<_> = (1..=5)
        .map(|i| purchase(&format!("G{:02}", i), "100", i))
        .collect();
    let wallet = MemoryWallet::new(history, "0");
    let ledger = MemoryLedger::new();
    let config = config().with_page_size(2).with_transaction_limit(100);

    let report = engine(config, &wallet, &ledger).run().await.unwrap();

    assert_eq!(wallet.page_requests(), vec![(1, 2), (2, 2), (3, 2), (4, 2)]);
    assert_eq!(report.fetched, 5);
    assert_eq!(report.created, 5);
}

#[tokio::test]
async fn test_default_page_size_is_999() {
    let wallet = MemoryWallet::new(scenario_records(), "4700");
    let ledger = MemoryLedger::new();

    engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(wallet.page_requests(), vec![(1, 999), (2, 999)]);
}

#[tokio::test]
async fn test_per_record_failures_are_skipped() {
    let mut bad_date = purchase("H1", "100", 1);
    bad_date.sale_datetime = "2024-12-01".to_string();
    let mut bad_amount = purchase("H2", "100", 2);
    bad_amount.amount = "1,000".to_string();
    let history = vec![
        bad_date,
        bad_amount,
        purchase("H3", "100", 3),
        purchase("H4", "100", 4),
        purchase("H5", "100", 5),
    ];
    let wallet = MemoryWallet::new(history, "0");
    let ledger = MemoryLedger::new();
    ledger.fail_search_for("H3");
    ledger.fail_create_for("H4-01");

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.skipped_invalid, 2);
    assert_eq!(report.failed_lookups, 1);
    assert_eq!(report.failed_creates, 1);
    assert_eq!(report.created, 1);

    let entries = ledger.entries(primary_id(&ledger));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].cheque_number.as_deref(), Some("H5-01"));
}

#[tokio::test]
async fn test_unusual_references_and_long_names_are_created() {
    let dotted = purchase("A2.7", "100", 6);
    let mut long_name = purchase("A3", "200", 7);
    long_name.shop_name = "ｘ".repeat(300);
    let wallet = MemoryWallet::new(vec![dotted, long_name], "0");
    let ledger = MemoryLedger::new();

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.skipped_invalid, 0);

    let entries = ledger.entries(primary_id(&ledger));
    assert_eq!(entries[0].cheque_number.as_deref(), Some("A2.7-01"));
    assert_eq!(entries[1].payee, "x".repeat(300));

    let second = engine(config(), &wallet, &ledger).run().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.already_existing, 2);
}

#[tokio::test]
async fn test_balance_correction_when_wallet_is_lower() {
    let wallet = MemoryWallet::new(vec![], "4000");
    let ledger = MemoryLedger::new().with_account(ACCOUNT, BigDecimal::from(5000));

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    let expected = BalanceCorrection {
        starting_balance: BigDecimal::from(4000),
        as_of: today(),
    };
    assert_eq!(report.wallet_balance, BigDecimal::from(4000));
    assert_eq!(report.ledger_balance, BigDecimal::from(5000));
    assert_eq!(report.balance_correction, Some(expected.clone()));
    assert_eq!(ledger.starting_balance_updates(), vec![expected]);

    let account = ledger.account(ACCOUNT).unwrap();
    assert_eq!(
        account.primary_transaction_account.starting_balance,
        BigDecimal::from(4000)
    );
    assert_eq!(account.current_balance, BigDecimal::from(4000));
}

#[tokio::test]
async fn test_no_correction_when_wallet_is_equal_or_higher() {
    for wallet_balance in ["5000", "5000.00", "6200.5"] {
        let wallet = MemoryWallet::new(vec![], wallet_balance);
        let ledger = MemoryLedger::new().with_account(ACCOUNT, BigDecimal::from(5000));

        let report = engine(config(), &wallet, &ledger).run().await.unwrap();

        assert!(report.balance_correction.is_none(), "{wallet_balance}");
        assert!(ledger.starting_balance_updates().is_empty());
        assert_eq!(
            report.wallet_balance,
            BigDecimal::from_str(wallet_balance).unwrap()
        );
    }
}

#[tokio::test]
async fn test_balance_is_compared_after_new_entries() {
    // Ledger starts at 1000, the run adds a 5000 top-up: 6000 > 5500 in the wallet
    let wallet = MemoryWallet::new(vec![scenario_records().remove(0)], "5500");
    let ledger = MemoryLedger::new().with_account(ACCOUNT, BigDecimal::from(1000));

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.ledger_balance, BigDecimal::from(6000));
    assert_eq!(
        report.balance_correction.map(|c| c.starting_balance),
        Some(BigDecimal::from(5500))
    );
}

#[tokio::test]
async fn test_existing_legacy_entries_are_recognized() {
    let ledger = MemoryLedger::new().with_account(ACCOUNT, BigDecimal::from(0));
    let transaction_account_id = primary_id(&ledger);
    ledger.seed_entry(
        transaction_account_id,
        LedgerEntry {
            id: 0,
            payee: "Shop L1".to_string(),
            amount: BigDecimal::from(-100),
            date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            is_transfer: false,
            memo: Some("Shop L1 L1 contactless card payment".to_string()),
            cheque_number: Some("L1".to_string()),
            note: None,
        },
    );
    let wallet = MemoryWallet::new(vec![purchase("L1", "100", 1)], "-100");

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.already_existing, 1);
    assert_eq!(report.created, 0);
}

#[tokio::test]
async fn test_same_settlement_different_sub_number_is_created() {
    let first = purchase("S1", "100", 5);
    let mut second = purchase("S1", "40", 5);
    second.wallet_settlement_sub_no = "02".to_string();
    let wallet = MemoryWallet::new(vec![first, second], "0");
    let ledger = MemoryLedger::new();

    let report = engine(config(), &wallet, &ledger).run().await.unwrap();

    assert_eq!(report.created, 2);
    let references: Vec<_> = ledger
        .entries(primary_id(&ledger))
        .into_iter()
        .filter_map(|e| e.cheque_number)
        .collect();
    assert_eq!(references, vec!["S1-01", "S1-02"]);
}

#[tokio::test]
async fn test_auth_failure_is_fatal() {
    let wallet = MemoryWallet::new(scenario_records(), "0").with_credentials(WalletCredentials {
        wallet_id: "someone-else".to_string(),
        device_id: "device-1".to_string(),
    });
    let ledger = MemoryLedger::new();

    let err = engine(config(), &wallet, &ledger).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(_)));
    assert!(wallet.page_requests().is_empty());
}

#[tokio::test]
async fn test_page_failure_is_fatal() {
    let wallet = MemoryWallet::new(scenario_records(), "0").with_credentials(credentials());
    wallet.fail_page(1);
    let ledger = MemoryLedger::new();

    let err = engine(config(), &wallet, &ledger).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Wallet(_)));
}

#[tokio::test]
async fn test_account_bootstrap_failure_is_fatal() {
    let wallet = MemoryWallet::new(scenario_records(), "0");
    let ledger = MemoryLedger::new();
    ledger.fail_account_lookups(true);

    let err = engine(config(), &wallet, &ledger).run().await.unwrap_err();

    assert!(matches!(err, SyncError::AccountBootstrap(_)));
    assert!(wallet.page_requests().is_empty());
}

#[tokio::test]
async fn test_malformed_balance_is_fatal_after_entries() {
    let wallet = MemoryWallet::new(scenario_records(), "not-a-number");
    let ledger = MemoryLedger::new();

    let err = engine(config(), &wallet, &ledger).run().await.unwrap_err();

    assert!(matches!(err, SyncError::InvalidBalance(_)));
    assert_eq!(ledger.entries(primary_id(&ledger)).len(), 2);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let wallet = MemoryWallet::new(scenario_records(), "0");
    let ledger = MemoryLedger::new();
    let mut config = config();
    config.ledger_token = String::new();

    let err = engine(config, &wallet, &ledger).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Config(_)));
    assert_eq!(ledger.account_count(), 0);
}

/// Read back the whole history a wallet serves
async fn wallet_records(wallet: &MemoryWallet) -> Vec<RawWalletTransaction> {
    use wallet_ledger_sync::{WalletProvider, WalletSession};

    let session = WalletSession {
        access_token: "t".to_string(),
    };
    wallet
        .fetch_transaction_page(&session, 1, 999)
        .await
        .unwrap()
}
