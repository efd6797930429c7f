use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use uuid::Uuid;

use crate::domain::{AccountId, Entry, TransferId};

use super::{StoreError, map_sqlx_error};

pub(crate) async fn insert_entry<'e, E>(executor: E, entry: &Entry) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO entries (id, account_id, transfer_id, amount_cents, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.account_id.to_string())
    .bind(entry.transfer_id.map(|id| id.to_string()))
    .bind(entry.amount_cents)
    .bind(entry.created_at.to_rfc3339())
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_entry", e))?;
    Ok(())
}

/// Entries of an account in the order they were appended.
pub(crate) async fn list_entries_for_account<'e, E>(
    executor: E,
    account_id: AccountId,
) -> Result<Vec<Entry>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, account_id, transfer_id, amount_cents, created_at
        FROM entries
        WHERE account_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(account_id.to_string())
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("list_entries_for_account", e))?;

    rows.iter().map(row_to_entry).collect()
}

pub(crate) async fn list_entries_for_transfer<'e, E>(
    executor: E,
    transfer_id: TransferId,
) -> Result<Vec<Entry>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, account_id, transfer_id, amount_cents, created_at
        FROM entries
        WHERE transfer_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(transfer_id.to_string())
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("list_entries_for_transfer", e))?;

    rows.iter().map(row_to_entry).collect()
}

pub(crate) async fn count_entries<'e, E>(executor: E) -> Result<i64, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS count FROM entries")
        .fetch_one(executor)
        .await
        .map_err(|e| map_sqlx_error("count_entries", e))?;
    Ok(row.get("count"))
}

fn row_to_entry(row: &SqliteRow) -> Result<Entry, StoreError> {
    let id_str: String = row.get("id");
    let account_str: String = row.get("account_id");
    let transfer_str: Option<String> = row.get("transfer_id");
    let created_at_str: String = row.get("created_at");

    Ok(Entry {
        id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
        account_id: Uuid::parse_str(&account_str).context("Invalid account ID")?,
        transfer_id: transfer_str
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .context("Invalid transfer ID")?,
        amount_cents: row.get("amount_cents"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc),
    })
}
