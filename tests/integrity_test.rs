mod common;

use anyhow::Result;
use common::{StandardAccounts, test_config, test_service};
use ebank::Repository;
use ebank::domain::IntegrityIssue;
use ebank::io::Exporter;
use tempfile::TempDir;

/// A second handle on the test database for writing behind the ledger's back.
async fn raw_repository(temp: &TempDir) -> Result<Repository> {
    Ok(Repository::connect(&test_config(temp), false).await?)
}

#[tokio::test]
async fn test_healthy_after_transfers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    service.transfer(a.id, b.id, 3000).await?;
    service.transfer(b.id, a.id, 1000).await?;
    let _ = service.transfer(a.id, b.id, 1_000_000).await;

    let report = service.check_integrity().await?;

    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transfer_count, 2);
    // Two opening entries plus two legs per transfer
    assert_eq!(report.entry_count, 6);

    Ok(())
}

#[tokio::test]
async fn test_empty_ledger_is_healthy() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let report = service.check_integrity().await?;

    assert!(report.is_healthy());
    assert_eq!(report.account_count, 0);
    assert_eq!(report.transfer_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_detects_tampered_balance() -> Result<()> {
    let (service, temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    service.transfer(a.id, b.id, 3000).await?;

    let raw = raw_repository(&temp).await?;
    sqlx::query("UPDATE accounts SET balance_cents = balance_cents + 1 WHERE id = ?")
        .bind(a.id.to_string())
        .execute(raw.pool())
        .await?;

    let report = service.check_integrity().await?;

    assert!(!report.is_healthy());
    assert!(report.issues.contains(&IntegrityIssue::BalanceMismatch {
        account_id: a.id,
        balance: 7001,
        entry_total: 7000,
    }));

    let statement = service.statement(a.id).await?;
    assert!(!statement.is_consistent());

    Ok(())
}

#[tokio::test]
async fn test_history_is_append_only() -> Result<()> {
    let (service, temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    let result = service.transfer(a.id, b.id, 3000).await?;

    let raw = raw_repository(&temp).await?;

    let update_entry = sqlx::query("UPDATE entries SET amount_cents = 0 WHERE id = ?")
        .bind(result.from_entry.id.to_string())
        .execute(raw.pool())
        .await;
    assert!(update_entry.is_err());

    let delete_entry = sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(result.to_entry.id.to_string())
        .execute(raw.pool())
        .await;
    assert!(delete_entry.is_err());

    let delete_transfer = sqlx::query("DELETE FROM transfers WHERE id = ?")
        .bind(result.transfer.id.to_string())
        .execute(raw.pool())
        .await;
    assert!(delete_transfer.is_err());

    let delete_account = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(b.id.to_string())
        .execute(raw.pool())
        .await;
    assert!(delete_account.is_err());

    let change_currency = sqlx::query("UPDATE accounts SET currency = 'EUR' WHERE id = ?")
        .bind(a.id.to_string())
        .execute(raw.pool())
        .await;
    assert!(change_currency.is_err());

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);

    Ok(())
}

#[tokio::test]
async fn test_export_accounts_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    service.transfer(a.id, b.id, 3000).await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_accounts_csv(&mut buffer)
        .await?;
    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(count, 2);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,owner,currency,balance_cents,balance,created_at"
    );
    assert!(csv.contains(&format!("{},alice,USD,7000,70.00,", a.id)));
    assert!(csv.contains(&format!("{},bob,USD,8000,80.00,", b.id)));

    Ok(())
}

#[tokio::test]
async fn test_export_statement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    let result = service.transfer(a.id, b.id, 3000).await?;
    let exporter = Exporter::new(&service);

    let mut buffer = Vec::new();
    let count = exporter.export_statement_csv(a.id, &mut buffer).await?;
    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(count, 2);
    assert!(lines[1].ends_with(",,10000,10000"));
    assert!(lines[2].ends_with(&format!(",{},-3000,7000", result.transfer.id)));

    let mut buffer = Vec::new();
    let snapshot = exporter.export_statement_json(a.id, &mut buffer).await?;
    let json: serde_json::Value = serde_json::from_slice(&buffer)?;

    assert_eq!(snapshot.statement.entry_total, 7000);
    assert_eq!(json["account"]["balance_cents"], 7000);
    assert_eq!(json["account"]["currency"], "USD");
    assert_eq!(json["entries"].as_array().map(|e| e.len()), Some(2));
    assert_eq!(json["entry_total"], 7000);

    Ok(())
}
