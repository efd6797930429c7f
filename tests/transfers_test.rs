mod common;

use anyhow::Result;
use common::{StandardAccounts, test_service, total_balance};
use ebank::application::{ErrorKind, LedgerError};
use ebank::domain::Currency;
use uuid::Uuid;

#[tokio::test]
async fn test_transfer_moves_money() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    let result = service.transfer(a.id, b.id, 3000).await?;

    assert_eq!(result.from_account.balance_cents, 7000);
    assert_eq!(result.to_account.balance_cents, 8000);
    assert_eq!(result.transfer.sequence, 1);
    assert_eq!(result.transfer.from_account, a.id);
    assert_eq!(result.transfer.to_account, b.id);

    // Stored balances agree with what the transfer reported
    assert_eq!(service.get_account(a.id).await?.balance_cents, 7000);
    assert_eq!(service.get_account(b.id).await?.balance_cents, 8000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_records_both_legs() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    let result = service.transfer(a.id, b.id, 3000).await?;

    assert_eq!(result.from_entry.account_id, a.id);
    assert_eq!(result.from_entry.amount_cents, -3000);
    assert_eq!(result.from_entry.transfer_id, Some(result.transfer.id));
    assert_eq!(result.to_entry.account_id, b.id);
    assert_eq!(result.to_entry.amount_cents, 3000);
    assert_eq!(result.to_entry.transfer_id, Some(result.transfer.id));

    let info = service.get_transfer_info(result.transfer.id).await?;
    assert_eq!(info.transfer, result.transfer);
    assert_eq!(info.entries.len(), 2);
    assert_eq!(info.entries.iter().map(|e| e.amount_cents).sum::<i64>(), 0);

    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    service.transfer(a.id, b.id, 3000).await?;
    let before = service.check_integrity().await?;

    let result = service.transfer(a.id, b.id, 100000).await;

    match result {
        Err(LedgerError::InsufficientFunds {
            account_id,
            balance,
            required,
        }) => {
            assert_eq!(account_id, a.id);
            assert_eq!(balance, 7000);
            assert_eq!(required, 100000);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    assert_eq!(service.get_account(a.id).await?.balance_cents, 7000);
    assert_eq!(service.get_account(b.id).await?.balance_cents, 8000);

    let after = service.check_integrity().await?;
    assert_eq!(after.transfer_count, before.transfer_count);
    assert_eq!(after.entry_count, before.entry_count);

    Ok(())
}

#[tokio::test]
async fn test_transfer_entire_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    let result = service.transfer(a.id, b.id, 10000).await?;

    assert_eq!(result.from_account.balance_cents, 0);
    assert_eq!(result.to_account.balance_cents, 15000);

    let result = service.transfer(a.id, b.id, 1).await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

    Ok(())
}

#[tokio::test]
async fn test_same_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, .. } = StandardAccounts::create(&service).await?;

    let err = service.transfer(a.id, a.id, 10).await.unwrap_err();

    assert!(matches!(err, LedgerError::SameAccount(id) if id == a.id));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.get_account(a.id).await?.balance_cents, 10000);

    Ok(())
}

#[tokio::test]
async fn test_currency_mismatch_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let usd = service.create_account("alice", "USD", 10000).await?;
    let eur = service.create_account("bob", "EUR", 5000).await?;
    let before = service.check_integrity().await?;

    let err = service.transfer(usd.id, eur.id, 1000).await.unwrap_err();

    assert!(matches!(
        err,
        LedgerError::CurrencyMismatch {
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
        }
    ));
    assert_eq!(service.get_account(usd.id).await?.balance_cents, 10000);
    assert_eq!(service.get_account(eur.id).await?.balance_cents, 5000);
    assert!(service.list_transfers(None, None).await?.is_empty());

    let after = service.check_integrity().await?;
    assert_eq!(after.transfer_count, before.transfer_count);
    assert_eq!(after.entry_count, before.entry_count);
    assert_eq!(service.statement(usd.id).await?.entries.len(), 1);
    assert_eq!(service.statement(eur.id).await?.entries.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    for amount in [0, -1, -5000] {
        let result = service.transfer(a.id, b.id, amount).await;
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }
    assert!(service.list_transfers(None, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, .. } = StandardAccounts::create(&service).await?;
    let ghost = Uuid::new_v4();

    let result = service.transfer(a.id, ghost, 100).await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(id)) if id == ghost));

    let result = service.transfer(ghost, a.id, 100).await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(id)) if id == ghost));

    assert_eq!(service.get_account(a.id).await?.balance_cents, 10000);

    Ok(())
}

#[tokio::test]
async fn test_unknown_transfer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let id = Uuid::new_v4();

    let err = service.get_transfer_info(id).await.unwrap_err();

    assert!(matches!(err, LedgerError::TransferNotFound(missing) if missing == id));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_total_money_is_conserved() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    let c = service.create_account("carol", "USD", 2500).await?;
    let total = total_balance(&service).await?;

    service.transfer(a.id, b.id, 1234).await?;
    service.transfer(b.id, c.id, 4321).await?;
    service.transfer(c.id, a.id, 999).await?;
    let _ = service.transfer(c.id, b.id, 1_000_000).await;

    assert_eq!(total_balance(&service).await?, total);

    Ok(())
}

#[tokio::test]
async fn test_transfers_listed_in_sequence() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;
    let c = service.create_account("carol", "USD", 0).await?;

    service.transfer(a.id, b.id, 100).await?;
    service.transfer(b.id, c.id, 200).await?;
    service.transfer(a.id, c.id, 300).await?;

    let all = service.list_transfers(None, None).await?;
    let sequences: Vec<i64> = all.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let for_b = service.list_transfers(Some(b.id), None).await?;
    assert_eq!(for_b.len(), 2);
    assert!(for_b.iter().all(|t| t.touches(b.id)));

    let latest = service.list_transfers(None, Some(2)).await?;
    let sequences: Vec<i64> = latest.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, vec![2, 3]);

    let ghost = service.list_transfers(Some(Uuid::new_v4()), None).await;
    assert!(matches!(ghost, Err(LedgerError::AccountNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_statement_matches_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let StandardAccounts { a, b } = StandardAccounts::create(&service).await?;

    service.transfer(a.id, b.id, 3000).await?;
    service.transfer(b.id, a.id, 500).await?;

    let statement = service.statement(a.id).await?;
    let amounts: Vec<i64> = statement.entries.iter().map(|e| e.amount_cents).collect();

    assert_eq!(amounts, vec![10000, -3000, 500]);
    assert!(statement.entries[0].is_opening());
    assert_eq!(statement.entry_total, 7500);
    assert_eq!(statement.account.balance_cents, 7500);
    assert!(statement.is_consistent());

    Ok(())
}
