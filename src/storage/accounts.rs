use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use uuid::Uuid;

use crate::domain::{Account, AccountId, Cents, Currency};

use super::{StoreError, map_sqlx_error};

pub(crate) async fn insert_account<'e, E>(executor: E, account: &Account) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO accounts (id, owner, balance_cents, currency, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(account.id.to_string())
    .bind(&account.owner)
    .bind(account.balance_cents)
    .bind(account.currency.as_str())
    .bind(account.created_at.to_rfc3339())
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_account", e))?;
    Ok(())
}

pub(crate) async fn fetch_account<'e, E>(
    executor: E,
    id: AccountId,
) -> Result<Option<Account>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, owner, balance_cents, currency, created_at
        FROM accounts
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(|e| map_sqlx_error("fetch_account", e))?;

    row.as_ref().map(row_to_account).transpose()
}

/// Read an account while taking the write lock that covers its row.
///
/// The no-op update makes SQLite acquire the database write lock before the
/// row is returned, waiting up to the connection's busy timeout for any other
/// holder. The returned balance is the value persisted at lock time and stays
/// valid until the enclosing transaction ends.
pub(crate) async fn lock_account<'e, E>(
    executor: E,
    id: AccountId,
) -> Result<Option<Account>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        UPDATE accounts
        SET balance_cents = balance_cents
        WHERE id = ?
        RETURNING id, owner, balance_cents, currency, created_at
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(|e| map_sqlx_error("lock_account", e))?;

    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn update_balance<'e, E>(
    executor: E,
    id: AccountId,
    balance_cents: Cents,
) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE accounts SET balance_cents = ? WHERE id = ?")
        .bind(balance_cents)
        .bind(id.to_string())
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error("update_balance", e))?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Database {
            operation: "update_balance".to_string(),
            detail: format!("expected to update account {}, updated {} rows", id, result.rows_affected()),
        });
    }
    Ok(())
}

pub(crate) async fn list_accounts<'e, E>(
    executor: E,
    owner: Option<&str>,
) -> Result<Vec<Account>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = match owner {
        Some(owner) => {
            sqlx::query(
                r#"
                SELECT id, owner, balance_cents, currency, created_at
                FROM accounts
                WHERE owner = ?
                ORDER BY created_at, id
                "#,
            )
            .bind(owner)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, owner, balance_cents, currency, created_at
                FROM accounts
                ORDER BY owner, created_at, id
                "#,
            )
            .fetch_all(executor)
            .await
        }
    }
    .map_err(|e| map_sqlx_error("list_accounts", e))?;

    rows.iter().map(row_to_account).collect()
}

fn row_to_account(row: &SqliteRow) -> Result<Account, StoreError> {
    let id_str: String = row.get("id");
    let currency_str: String = row.get("currency");
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
        owner: row.get("owner"),
        balance_cents: row.get("balance_cents"),
        currency: Currency::from_code(&currency_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid currency: {}", currency_str))?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc),
    })
}
