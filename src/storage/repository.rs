use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::domain::{AccountId, Cents, IntegrityStats};

use super::{MIGRATION_001_INITIAL, StoreError, TransactionScope, entries, map_sqlx_error};

/// Handle on the ledger database, shared by every ledger component.
///
/// Cloning is cheap: clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool on the configured database file.
    ///
    /// Connections use WAL so readers never wait on a transfer in progress, and
    /// a busy timeout equal to the configured lock timeout so writers queue for
    /// the lock instead of failing immediately.
    pub async fn connect(config: &LedgerConfig, create_if_missing: bool) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.lock_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migration_001", e))?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    #[instrument(skip(config), fields(database = %config.database_path))]
    pub async fn init(config: &LedgerConfig) -> Result<Self, StoreError> {
        let repo = Self::connect(config, true).await?;
        repo.migrate().await?;
        info!("database initialized");
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a unit of work. Only ledger components open scopes.
    pub(crate) async fn begin(&self, label: &'static str) -> Result<TransactionScope, StoreError> {
        TransactionScope::begin(&self.pool, label).await
    }

    /// Gather the figures for a ledger integrity check.
    ///
    /// Every query runs in one scope, so counts and sums describe the same
    /// committed state even while transfers are committing.
    pub async fn integrity_stats(&self) -> Result<IntegrityStats, StoreError> {
        let mut scope = self.begin("integrity_check").await?;
        let outcome = collect_integrity_stats(&mut scope).await;
        scope.finish(outcome).await
    }
}

async fn collect_integrity_stats(scope: &mut TransactionScope) -> Result<IntegrityStats, StoreError> {
    let account_count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
        .fetch_one(scope.conn())
        .await
        .map_err(|e| map_sqlx_error("count_accounts", e))?
        .get("count");

    let entry_count = entries::count_entries(scope.conn()).await?;

    let sequence_check = sqlx::query(
        r#"
        SELECT
            MIN(sequence) AS min_seq,
            MAX(sequence) AS max_seq,
            COUNT(*) AS count
        FROM transfers
        "#,
    )
    .fetch_one(scope.conn())
    .await
    .map_err(|e| map_sqlx_error("check_sequence", e))?;

    let min_seq: Option<i64> = sequence_check.get("min_seq");
    let max_seq: Option<i64> = sequence_check.get("max_seq");
    let transfer_count: i64 = sequence_check.get("count");

    let has_sequence_gaps = match (min_seq, max_seq) {
        (Some(min), Some(max)) => min != 1 || (max - min + 1) != transfer_count,
        _ => false,
    };

    // A transfer is balanced when it has exactly its two legs:
    // -amount on the source and +amount on the destination.
    let unbalanced_transfers: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM transfers t
        WHERE (SELECT COUNT(*) FROM entries e WHERE e.transfer_id = t.id) <> 2
           OR NOT EXISTS (
                SELECT 1 FROM entries e
                WHERE e.transfer_id = t.id
                  AND e.account_id = t.from_account_id
                  AND e.amount_cents = -t.amount_cents)
           OR NOT EXISTS (
                SELECT 1 FROM entries e
                WHERE e.transfer_id = t.id
                  AND e.account_id = t.to_account_id
                  AND e.amount_cents = t.amount_cents)
        "#,
    )
    .fetch_one(scope.conn())
    .await
    .map_err(|e| map_sqlx_error("check_transfer_legs", e))?
    .get("count");

    let transfer_entry_total: Cents = sqlx::query(
        "SELECT COALESCE(SUM(amount_cents), 0) AS total FROM entries WHERE transfer_id IS NOT NULL",
    )
    .fetch_one(scope.conn())
    .await
    .map_err(|e| map_sqlx_error("sum_transfer_entries", e))?
    .get("total");

    let mismatch_rows = sqlx::query(
        r#"
        SELECT a.id AS id, a.balance_cents AS balance, COALESCE(SUM(e.amount_cents), 0) AS entry_total
        FROM accounts a
        LEFT JOIN entries e ON e.account_id = a.id
        GROUP BY a.id, a.balance_cents
        HAVING a.balance_cents <> COALESCE(SUM(e.amount_cents), 0)
        "#,
    )
    .fetch_all(scope.conn())
    .await
    .map_err(|e| map_sqlx_error("check_entry_sums", e))?;

    let mut balance_mismatches: Vec<(AccountId, Cents, Cents)> = Vec::with_capacity(mismatch_rows.len());
    for row in mismatch_rows {
        let id = parse_account_id(row.get("id"))?;
        balance_mismatches.push((id, row.get("balance"), row.get("entry_total")));
    }

    let negative_rows = sqlx::query("SELECT id, balance_cents FROM accounts WHERE balance_cents < 0")
        .fetch_all(scope.conn())
        .await
        .map_err(|e| map_sqlx_error("check_negative_balances", e))?;

    let mut negative_balances: Vec<(AccountId, Cents)> = Vec::with_capacity(negative_rows.len());
    for row in negative_rows {
        let id = parse_account_id(row.get("id"))?;
        negative_balances.push((id, row.get("balance_cents")));
    }

    Ok(IntegrityStats {
        account_count,
        transfer_count,
        entry_count,
        has_sequence_gaps,
        unbalanced_transfers,
        transfer_entry_total,
        balance_mismatches,
        negative_balances,
    })
}

fn parse_account_id(id: String) -> Result<AccountId, StoreError> {
    Ok(Uuid::parse_str(&id).context("Invalid account ID")?)
}
