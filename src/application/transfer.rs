use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::{Account, AccountId, Cents, Entry, Transfer, lock_order};
use crate::storage::{Repository, TransactionScope, transfers};

use super::{AccountRegistry, LedgerEntryLog, LedgerError};

/// Everything a committed transfer produced.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    /// Debit leg on the source account
    pub from_entry: Entry,
    /// Credit leg on the destination account
    pub to_entry: Entry,
    /// Source account as of commit
    pub from_account: Account,
    /// Destination account as of commit
    pub to_account: Account,
}

/// Moves money between two accounts as one indivisible unit of work.
///
/// The orchestrator is the only writer of transfers, transfer entries and
/// account balances. A transfer either commits all of them or none.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    repo: Repository,
    accounts: AccountRegistry,
    entries: LedgerEntryLog,
    deadline: Duration,
}

impl TransferOrchestrator {
    pub fn new(
        repo: Repository,
        accounts: AccountRegistry,
        entries: LedgerEntryLog,
        deadline: Duration,
    ) -> Self {
        Self {
            repo,
            accounts,
            entries,
            deadline,
        }
    }

    /// Transfer `amount_cents` from one account to another.
    ///
    /// Argument errors are reported before any lock is taken. If the whole
    /// operation does not finish within the deadline its scope is dropped,
    /// which rolls it back and releases the locks, and `LockTimeout` is
    /// returned.
    #[instrument(skip(self), fields(deadline_ms = self.deadline.as_millis() as u64), err)]
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferResult, LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccount(from));
        }
        if amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        match tokio::time::timeout(self.deadline, self.run(from, to, amount_cents)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("transfer deadline elapsed, scope rolled back");
                Err(LedgerError::LockTimeout("transfer".to_string()))
            }
        }
    }

    async fn run(
        &self,
        from: AccountId,
        to: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferResult, LedgerError> {
        let mut scope = self.repo.begin("transfer").await?;
        let outcome = self.apply(&mut scope, from, to, amount_cents).await;
        let result = scope.finish(outcome).await?;

        info!(
            transfer_id = %result.transfer.id,
            sequence = result.transfer.sequence,
            "transfer committed"
        );
        Ok(result)
    }

    async fn apply(
        &self,
        scope: &mut TransactionScope,
        from: AccountId,
        to: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferResult, LedgerError> {
        // Lock in id order whatever the direction, so opposite transfers
        // between the same pair cannot each hold one lock and wait on the other.
        let (first, second) = lock_order(from, to);
        let first_locked = self.accounts.get_for_update(first, scope).await?;
        let second_locked = self.accounts.get_for_update(second, scope).await?;
        let (mut source, mut destination) = if first == from {
            (first_locked, second_locked)
        } else {
            (second_locked, first_locked)
        };

        if source.currency != destination.currency {
            return Err(LedgerError::CurrencyMismatch {
                from_currency: source.currency,
                to_currency: destination.currency,
            });
        }

        if !source.can_cover(amount_cents) {
            return Err(LedgerError::InsufficientFunds {
                account_id: source.id,
                balance: source.balance_cents,
                required: amount_cents,
            });
        }

        let credited = destination
            .balance_cents
            .checked_add(amount_cents)
            .ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "Crediting {} cents would overflow the balance of account {}",
                    amount_cents, destination.id
                ))
            })?;

        let mut transfer = Transfer::new(source.id, destination.id, amount_cents);
        transfers::insert_transfer(scope.conn(), &mut transfer).await?;

        let from_entry = self
            .entries
            .append(scope, source.id, Some(transfer.id), -amount_cents)
            .await?;
        let to_entry = self
            .entries
            .append(scope, destination.id, Some(transfer.id), amount_cents)
            .await?;

        // Balances come from the locked reads above, never from a re-read.
        source.balance_cents -= amount_cents;
        destination.balance_cents = credited;
        self.accounts.store_balance(scope, &source).await?;
        self.accounts.store_balance(scope, &destination).await?;

        Ok(TransferResult {
            transfer,
            from_entry,
            to_entry,
            from_account: source,
            to_account: destination,
        })
    }
}
