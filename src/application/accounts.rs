use tracing::{debug, info, instrument};

use crate::domain::{Account, AccountId, Cents, Currency};
use crate::storage::{Repository, StoreError, TransactionScope, accounts};

use super::{LedgerEntryLog, LedgerError};

/// Owns account records: creation, lookup and locked reads for update.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    repo: Repository,
    entries: LedgerEntryLog,
}

impl AccountRegistry {
    pub fn new(repo: Repository) -> Self {
        let entries = LedgerEntryLog::new(repo.clone());
        Self { repo, entries }
    }

    /// Open an account for `owner` in `currency`.
    ///
    /// A non-zero opening balance is recorded as an opening entry in the same
    /// scope as the account row, so the account's entries always sum to its
    /// balance.
    #[instrument(skip(self), err)]
    pub async fn create_account(
        &self,
        owner: &str,
        currency: &str,
        opening_balance: Cents,
    ) -> Result<Account, LedgerError> {
        let currency = Currency::from_code(currency)
            .ok_or_else(|| LedgerError::UnsupportedCurrency(currency.to_string()))?;
        if opening_balance < 0 {
            return Err(LedgerError::InvalidAmount(
                "Opening balance cannot be negative".to_string(),
            ));
        }

        let account = Account::new(owner, currency, opening_balance);

        let mut scope = self.repo.begin("create_account").await?;
        let outcome = self.insert(&mut scope, &account).await;
        let account = scope.finish(outcome).await?;

        info!(account_id = %account.id, "account created");
        Ok(account)
    }

    async fn insert(&self, scope: &mut TransactionScope, account: &Account) -> Result<Account, LedgerError> {
        accounts::insert_account(scope.conn(), account)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => LedgerError::DuplicateAccount {
                    owner: account.owner.clone(),
                    currency: account.currency,
                },
                other => other.into(),
            })?;

        if account.balance_cents > 0 {
            self.entries
                .append(scope, account.id, None, account.balance_cents)
                .await?;
        }

        Ok(account.clone())
    }

    /// Get an account by ID.
    pub async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        accounts::fetch_account(self.repo.pool(), id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Read an account under an exclusive lock held until `scope` ends.
    ///
    /// Blocks while another scope holds the lock, up to the configured lock
    /// timeout, after which it fails with [`LedgerError::LockTimeout`].
    pub async fn get_for_update(
        &self,
        id: AccountId,
        scope: &mut TransactionScope,
    ) -> Result<Account, LedgerError> {
        let account = accounts::lock_account(scope.conn(), id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))?;
        debug!(scope = scope.label(), account_id = %id, "account locked");
        Ok(account)
    }

    /// Persist a balance computed under the account's lock.
    pub(crate) async fn store_balance(
        &self,
        scope: &mut TransactionScope,
        account: &Account,
    ) -> Result<(), LedgerError> {
        accounts::update_balance(scope.conn(), account.id, account.balance_cents).await?;
        Ok(())
    }

    /// List accounts, optionally only those of one owner.
    pub async fn list_accounts(&self, owner: Option<&str>) -> Result<Vec<Account>, LedgerError> {
        Ok(accounts::list_accounts(self.repo.pool(), owner).await?)
    }
}
