use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Currency};

pub type AccountId = Uuid;

/// A customer account holding a single-currency balance.
///
/// `owner` and `currency` never change after creation and accounts are never
/// deleted. The balance only moves through committed transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    /// Current balance in cents, never negative
    pub balance_cents: Cents,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(owner: impl Into<String>, currency: Currency, opening_balance: Cents) -> Self {
        assert!(opening_balance >= 0, "Opening balance cannot be negative");
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            balance_cents: opening_balance,
            currency,
            created_at: Utc::now(),
        }
    }

    /// Returns true if `amount` can be debited without the balance going negative.
    pub fn can_cover(&self, amount: Cents) -> bool {
        self.balance_cents >= amount
    }
}
