use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransferId = Uuid;

/// A transfer represents an atomic movement of money from one account to another.
/// Transfers are immutable and always come with exactly two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Gap-free commit order, assigned inside the transfer's scope
    pub sequence: i64,
    /// Source account (balance decreases)
    pub from_account: AccountId,
    /// Destination account (balance increases)
    pub to_account: AccountId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Create a new transfer. Sequence number must be assigned by the repository.
    pub fn new(from_account: AccountId, to_account: AccountId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Transfer amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            from_account,
            to_account,
            amount_cents,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the transfer moves money into or out of `account`.
    pub fn touches(&self, account: AccountId) -> bool {
        self.from_account == account || self.to_account == account
    }

    /// Signed effect of this transfer on `account`'s balance.
    pub fn net_effect(&self, account: AccountId) -> Cents {
        if self.to_account == account {
            self.amount_cents
        } else if self.from_account == account {
            -self.amount_cents
        } else {
            0
        }
    }
}
