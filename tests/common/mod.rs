// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use ebank::application::LedgerService;
use ebank::config::LedgerConfig;
use ebank::domain::Account;
use tempfile::TempDir;

/// Configuration pointing at a fresh database inside `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> LedgerConfig {
    let db_path = temp_dir.path().join("test.db");
    LedgerConfig::default()
        .with_database_path(db_path.to_string_lossy().into_owned())
        .with_lock_timeout(Duration::from_secs(5))
        .with_transfer_deadline(Duration::from_secs(15))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Test fixture: two USD accounts A=100.00 and B=50.00
pub struct StandardAccounts {
    pub a: Account,
    pub b: Account,
}

impl StandardAccounts {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let a = service.create_account("alice", "USD", 10000).await?;
        let b = service.create_account("bob", "USD", 5000).await?;
        Ok(Self { a, b })
    }
}

/// Sum of the balances of every account in the ledger
pub async fn total_balance(service: &LedgerService) -> Result<i64> {
    let accounts = service.list_accounts(None).await?;
    Ok(accounts.iter().map(|a| a.balance_cents).sum())
}
