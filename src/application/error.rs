use thiserror::Error;

use crate::domain::{AccountId, Cents, Currency, TransferId};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    #[error("Currency mismatch between accounts: {from_currency} vs {to_currency}")]
    CurrencyMismatch {
        from_currency: Currency,
        to_currency: Currency,
    },

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Account already exists for owner {owner} in {currency}")]
    DuplicateAccount { owner: String, currency: Currency },

    #[error("Timed out waiting for a lock during {0}")]
    LockTimeout(String),

    #[error("Database connection lost during {0}")]
    ConnectionLost(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

/// Coarse classification of a [`LedgerError`], for callers that map failures
/// onto transport status codes or decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is malformed for the current ledger; do not retry
    Validation,
    NotFound,
    /// A business rule rejected the request
    Conflict,
    /// Nothing was committed; safe to retry with backoff
    Transient,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::SameAccount(_)
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::UnsupportedCurrency(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_) | LedgerError::TransferNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::InsufficientFunds { .. } | LedgerError::DuplicateAccount { .. } => {
                ErrorKind::Conflict
            }
            LedgerError::LockTimeout(_) | LedgerError::ConnectionLost(_) => ErrorKind::Transient,
            LedgerError::Storage(_) => ErrorKind::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Busy { operation } => LedgerError::LockTimeout(operation),
            StoreError::ConnectionLost { operation, .. } => LedgerError::ConnectionLost(operation),
            other => LedgerError::Storage(other),
        }
    }
}
