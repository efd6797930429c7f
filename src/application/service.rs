use serde::Serialize;
use tracing::{instrument, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    Account, AccountId, Cents, Entry, IntegrityReport, Transfer, TransferId,
    build_integrity_report, compute_balance,
};
use crate::storage::{Repository, TransactionScope, accounts, entries, transfers};

use super::{AccountRegistry, LedgerEntryLog, LedgerError, TransferOrchestrator, TransferResult};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, etc.).
#[derive(Debug, Clone)]
pub struct LedgerService {
    repo: Repository,
    config: LedgerConfig,
    accounts: AccountRegistry,
    entries: LedgerEntryLog,
    orchestrator: TransferOrchestrator,
}

/// Detailed transfer information
#[derive(Debug, Clone, Serialize)]
pub struct TransferInfo {
    pub transfer: Transfer,
    pub entries: Vec<Entry>,
}

/// An account with every entry that makes up its balance
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub account: Account,
    pub entries: Vec<Entry>,
    pub entry_total: Cents,
}

impl Statement {
    /// Whether the stored balance agrees with the entry history.
    pub fn is_consistent(&self) -> bool {
        self.account.balance_cents == self.entry_total
    }
}

impl LedgerService {
    /// Create a new ledger service on an open repository.
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        let entries = LedgerEntryLog::new(repo.clone());
        let accounts = AccountRegistry::new(repo.clone());
        let orchestrator = TransferOrchestrator::new(
            repo.clone(),
            accounts.clone(),
            entries.clone(),
            config.transfer_deadline,
        );
        Self {
            repo,
            config,
            accounts,
            entries,
            orchestrator,
        }
    }

    /// Initialize a new database at the configured path.
    pub async fn init(config: LedgerConfig) -> Result<Self, LedgerError> {
        let repo = Repository::init(&config).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(config: LedgerConfig) -> Result<Self, LedgerError> {
        let repo = Repository::connect(&config, false).await?;
        Ok(Self::new(repo, config))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    pub fn entry_log(&self) -> &LedgerEntryLog {
        &self.entries
    }

    pub fn orchestrator(&self) -> &TransferOrchestrator {
        &self.orchestrator
    }

    // ========================
    // Account operations
    // ========================

    pub async fn create_account(
        &self,
        owner: &str,
        currency: &str,
        opening_balance: Cents,
    ) -> Result<Account, LedgerError> {
        self.accounts
            .create_account(owner, currency, opening_balance)
            .await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts.get(id).await
    }

    pub async fn list_accounts(&self, owner: Option<&str>) -> Result<Vec<Account>, LedgerError> {
        self.accounts.list_accounts(owner).await
    }

    /// Entries of an account with their total, next to the stored balance.
    ///
    /// Both reads run in one scope, so they see the same committed state even
    /// while transfers on the account are committing.
    pub async fn statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        let mut scope = self.repo.begin("statement").await?;
        let outcome = read_statement(&mut scope, account_id).await;
        scope.finish(outcome).await
    }

    // ========================
    // Transfer operations
    // ========================

    /// Transfer money, retrying failures that committed nothing.
    ///
    /// Only transient errors are retried; each retry runs a fresh scope, so a
    /// retried transfer is never applied twice.
    #[instrument(skip(self), fields(retries = self.config.transfer_retries))]
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferResult, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.orchestrator.transfer(from, to, amount_cents).await {
                Err(err) if err.is_transient() && attempt < self.config.transfer_retries => {
                    attempt += 1;
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying transfer"
                    );
                    tokio::time::sleep(backoff).await;
                }
                outcome => return outcome,
            }
        }
    }

    /// Get a transfer together with its entry legs.
    pub async fn get_transfer_info(&self, id: TransferId) -> Result<TransferInfo, LedgerError> {
        let transfer = transfers::fetch_transfer(self.repo.pool(), id)
            .await?
            .ok_or(LedgerError::TransferNotFound(id))?;
        let entries = self.entries.entries_for_transfer(id).await?;

        Ok(TransferInfo { transfer, entries })
    }

    /// List transfers in sequence order, optionally only those touching an account.
    pub async fn list_transfers(
        &self,
        account: Option<AccountId>,
        limit: Option<usize>,
    ) -> Result<Vec<Transfer>, LedgerError> {
        if let Some(id) = account {
            // Surface a typo'd id as NotFound rather than an empty list
            self.accounts.get(id).await?;
        }
        Ok(transfers::list_transfers(self.repo.pool(), account, limit).await?)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, LedgerError> {
        let stats = self.repo.integrity_stats().await?;
        Ok(build_integrity_report(stats))
    }
}

async fn read_statement(
    scope: &mut TransactionScope,
    account_id: AccountId,
) -> Result<Statement, LedgerError> {
    let account = accounts::fetch_account(scope.conn(), account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;
    let entries = entries::list_entries_for_account(scope.conn(), account_id).await?;
    let entry_total = compute_balance(account_id, &entries);

    Ok(Statement {
        account,
        entries,
        entry_total,
    })
}
