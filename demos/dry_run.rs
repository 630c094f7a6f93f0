//! Dry run against in-memory collaborators

use bigdecimal::BigDecimal;
use wallet_ledger_sync::utils::{MemoryLedger, MemoryWallet};
use wallet_ledger_sync::{RawWalletTransaction, ReconciliationEngine, SyncConfig, WalletCredentials};

fn history() -> Vec<RawWalletTransaction> {
    vec![
        RawWalletTransaction {
            sale_datetime: "20241223011207".to_string(),
            deal_type: "05".to_string(),
            amount: "5000".to_string(),
            wallet_settlement_no: "23123401120741221241".to_string(),
            wallet_settlement_sub_no: "01".to_string(),
            ..Default::default()
        },
        RawWalletTransaction {
            sale_datetime: "20241222090000".to_string(),
            description_type: "1018".to_string(),
            shop_name: "ＦＡＭＩＬＹ　ＭＡＲＴ".to_string(),
            amount: "300".to_string(),
            wallet_settlement_no: "22090001120741221241".to_string(),
            wallet_settlement_sub_no: "01".to_string(),
            ..Default::default()
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Wallet Ledger Sync - Dry Run\n");

    let wallet = MemoryWallet::new(history(), "4200");
    let ledger = MemoryLedger::new().with_account("ANA Pay", BigDecimal::from(0));

    let config = SyncConfig::new(
        WalletCredentials {
            wallet_id: "demo-wallet".to_string(),
            device_id: "demo-device".to_string(),
        },
        "demo-token".to_string(),
    );

    let engine = ReconciliationEngine::new(config, wallet.clone(), ledger.clone());

    let first = engine.run().await?;
    println!("First run:  {} fetched, {} created", first.fetched, first.created);

    let second = engine.run().await?;
    println!(
        "Second run: {} created, {} already present",
        second.created, second.already_existing
    );

    if let Some(account) = ledger.account("ANA Pay") {
        println!("\nEntries in {}:", account.title);
        for entry in ledger.entries(account.primary_transaction_account.id) {
            println!(
                "  {} {:>8} {:<20} ref={}",
                entry.date,
                entry.amount,
                entry.payee,
                entry.cheque_number.unwrap_or_default()
            );
        }
        println!("\nLedger balance: {}", account.current_balance);
    }

    match first.balance_correction {
        Some(correction) => println!(
            "Starting balance reset to {} as of {}",
            correction.starting_balance, correction.as_of
        ),
        None => println!("No balance correction needed"),
    }

    Ok(())
}
