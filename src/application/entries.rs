use tracing::debug;

use crate::domain::{AccountId, Cents, Entry, TransferId};
use crate::storage::{Repository, TransactionScope, entries};

use super::LedgerError;

/// Append-only log of ledger entries.
///
/// Entries are only ever inserted, inside the scope of the operation that
/// produces them; the schema rejects any update or delete.
#[derive(Debug, Clone)]
pub struct LedgerEntryLog {
    repo: Repository,
}

impl LedgerEntryLog {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Append one signed entry within `scope`.
    pub(crate) async fn append(
        &self,
        scope: &mut TransactionScope,
        account_id: AccountId,
        transfer_id: Option<TransferId>,
        amount_cents: Cents,
    ) -> Result<Entry, LedgerError> {
        let entry = Entry::new(account_id, transfer_id, amount_cents);
        entries::insert_entry(scope.conn(), &entry).await?;
        debug!(
            scope = scope.label(),
            account_id = %account_id,
            amount_cents,
            "entry appended"
        );
        Ok(entry)
    }

    /// Entries of an account, oldest first.
    pub async fn entries_for_account(&self, account_id: AccountId) -> Result<Vec<Entry>, LedgerError> {
        Ok(entries::list_entries_for_account(self.repo.pool(), account_id).await?)
    }

    /// The legs recorded for one transfer.
    pub async fn entries_for_transfer(&self, transfer_id: TransferId) -> Result<Vec<Entry>, LedgerError> {
        Ok(entries::list_entries_for_transfer(self.repo.pool(), transfer_id).await?)
    }
}
