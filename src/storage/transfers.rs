use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::domain::{AccountId, Transfer, TransferId};

use super::{StoreError, map_sqlx_error};

/// Save a new transfer, assigning it the next sequence number.
///
/// Must run inside the transfer's scope so a rolled back transfer also gives
/// its sequence number back.
pub(crate) async fn insert_transfer(
    conn: &mut SqliteConnection,
    transfer: &mut Transfer,
) -> Result<(), StoreError> {
    transfer.sequence = next_sequence(&mut *conn).await?;

    sqlx::query(
        r#"
        INSERT INTO transfers (id, sequence, from_account_id, to_account_id, amount_cents, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(transfer.id.to_string())
    .bind(transfer.sequence)
    .bind(transfer.from_account.to_string())
    .bind(transfer.to_account.to_string())
    .bind(transfer.amount_cents)
    .bind(transfer.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_transfer", e))?;

    Ok(())
}

async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let row = sqlx::query(
        r#"
        UPDATE sequence_counter
        SET value = value + 1
        WHERE name = 'transfer_sequence'
        RETURNING value
        "#,
    )
    .fetch_one(conn)
    .await
    .map_err(|e| map_sqlx_error("next_sequence", e))?;

    Ok(row.get("value"))
}

pub(crate) async fn fetch_transfer<'e, E>(
    executor: E,
    id: TransferId,
) -> Result<Option<Transfer>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, sequence, from_account_id, to_account_id, amount_cents, created_at
        FROM transfers
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(|e| map_sqlx_error("fetch_transfer", e))?;

    row.as_ref().map(row_to_transfer).transpose()
}

/// List transfers by sequence, optionally only those touching one account.
pub(crate) async fn list_transfers<'e, E>(
    executor: E,
    account_id: Option<AccountId>,
    limit: Option<usize>,
) -> Result<Vec<Transfer>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = String::from(
        "SELECT id, sequence, from_account_id, to_account_id, amount_cents, created_at FROM transfers",
    );
    if account_id.is_some() {
        query.push_str(" WHERE from_account_id = ? OR to_account_id = ?");
    }
    // With a limit keep the latest transfers, still returned oldest first
    if let Some(limit) = limit {
        query = format!(
            "SELECT * FROM ({} ORDER BY sequence DESC LIMIT {}) ORDER BY sequence",
            query, limit
        );
    } else {
        query.push_str(" ORDER BY sequence");
    }

    let account_str = account_id.map(|id| id.to_string());
    let mut sql_query = sqlx::query(&query);
    if let Some(ref id) = account_str {
        sql_query = sql_query.bind(id).bind(id);
    }

    let rows = sql_query
        .fetch_all(executor)
        .await
        .map_err(|e| map_sqlx_error("list_transfers", e))?;

    rows.iter().map(row_to_transfer).collect()
}

fn row_to_transfer(row: &SqliteRow) -> Result<Transfer, StoreError> {
    let id_str: String = row.get("id");
    let from_str: String = row.get("from_account_id");
    let to_str: String = row.get("to_account_id");
    let created_at_str: String = row.get("created_at");

    Ok(Transfer {
        id: Uuid::parse_str(&id_str).context("Invalid transfer ID")?,
        sequence: row.get("sequence"),
        from_account: Uuid::parse_str(&from_str).context("Invalid from_account ID")?,
        to_account: Uuid::parse_str(&to_str).context("Invalid to_account ID")?,
        amount_cents: row.get("amount_cents"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc),
    })
}
