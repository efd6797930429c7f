use std::fmt::Display;
use std::time::Instant;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use super::{StoreError, map_sqlx_error};

/// A unit of work over the store.
///
/// Exactly one of commit or rollback happens for every scope: [`finish`]
/// commits an `Ok` outcome and rolls back an `Err` one, and a scope dropped
/// before finishing (an early return, a cancelled future, an elapsed deadline)
/// is rolled back by the underlying transaction. Scopes are opened only by the
/// ledger's own components.
///
/// [`finish`]: TransactionScope::finish
pub struct TransactionScope {
    tx: Transaction<'static, Sqlite>,
    guard: ScopeGuard,
}

struct ScopeGuard {
    label: &'static str,
    started: Instant,
    finished: bool,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                scope = self.label,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "scope dropped before completion, rolling back"
            );
        }
    }
}

impl TransactionScope {
    pub(crate) async fn begin(pool: &SqlitePool, label: &'static str) -> Result<Self, StoreError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        debug!(scope = label, "scope opened");

        Ok(Self {
            tx,
            guard: ScopeGuard {
                label,
                started: Instant::now(),
                finished: false,
            },
        })
    }

    /// Connection all statements of this scope must run on.
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn label(&self) -> &'static str {
        self.guard.label
    }

    pub(crate) async fn commit(self) -> Result<(), StoreError> {
        let Self { tx, mut guard } = self;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        guard.finished = true;
        debug!(
            scope = guard.label,
            elapsed_ms = guard.started.elapsed().as_millis() as u64,
            "scope committed"
        );
        Ok(())
    }

    pub(crate) async fn rollback(self) -> Result<(), StoreError> {
        let Self { tx, mut guard } = self;
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))?;
        guard.finished = true;
        debug!(scope = guard.label, "scope rolled back");
        Ok(())
    }

    /// Commit on success, roll back on failure, and hand the outcome back.
    ///
    /// A failed rollback is logged and the original error is returned; the
    /// transaction is still discarded when the connection goes back to the pool.
    pub(crate) async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError> + Display,
    {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let label = self.label();
                if let Err(rollback_err) = self.rollback().await {
                    warn!(scope = label, error = %rollback_err, "rollback failed");
                }
                debug!(scope = label, error = %err, "scope aborted");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::LedgerConfig;
    use crate::domain::{Account, Currency};
    use crate::storage::{Repository, accounts};

    async fn test_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scope.db");
        let config = LedgerConfig::default().with_database_path(path.to_str().unwrap());
        let repo = Repository::init(&config).await.unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_finish_ok_commits() {
        let (repo, _temp) = test_repo().await;
        let account = Account::new("alice", Currency::Usd, 100);

        let mut scope = repo.begin("test").await.unwrap();
        let outcome: Result<(), StoreError> =
            accounts::insert_account(scope.conn(), &account).await;
        scope.finish(outcome).await.unwrap();

        let stored = accounts::fetch_account(repo.pool(), account.id).await.unwrap();
        assert_eq!(stored, Some(account));
    }

    #[tokio::test]
    async fn test_finish_err_rolls_back() {
        let (repo, _temp) = test_repo().await;
        let account = Account::new("alice", Currency::Usd, 100);

        let mut scope = repo.begin("test").await.unwrap();
        accounts::insert_account(scope.conn(), &account).await.unwrap();
        let outcome: Result<(), StoreError> = Err(StoreError::Database {
            operation: "test".into(),
            detail: "forced failure".into(),
        });
        assert!(scope.finish(outcome).await.is_err());

        let stored = accounts::fetch_account(repo.pool(), account.id).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_dropped_scope_rolls_back() {
        let (repo, _temp) = test_repo().await;
        let account = Account::new("alice", Currency::Usd, 100);

        {
            let mut scope = repo.begin("test").await.unwrap();
            accounts::insert_account(scope.conn(), &account).await.unwrap();
        }

        let stored = accounts::fetch_account(repo.pool(), account.id).await.unwrap();
        assert!(stored.is_none());
    }
}
