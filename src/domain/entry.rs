use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, TransferId};

pub type EntryId = Uuid;

/// One signed line of the audit trail for an account.
///
/// Debits are negative, credits positive. Entries are write-once: the sum of an
/// account's entries is always its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    /// The transfer this entry is a leg of; `None` for an opening balance
    pub transfer_id: Option<TransferId>,
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(account_id: AccountId, transfer_id: Option<TransferId>, amount_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transfer_id,
            amount_cents,
            created_at: Utc::now(),
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount_cents < 0
    }

    pub fn is_opening(&self) -> bool {
        self.transfer_id.is_none()
    }
}
