//! Runtime configuration for the ledger.
//!
//! Every knob has a default suitable for a local database; the CLI overrides
//! them from arguments or `EBANK_*` environment variables.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Path of the SQLite database file
    pub database_path: String,
    /// Upper bound on pooled connections, and so on concurrently running scopes
    pub max_connections: u32,
    /// How long a statement waits for a lock held by another scope
    pub lock_timeout: Duration,
    /// Deadline for a whole transfer, lock waits included
    pub transfer_deadline: Duration,
    /// Extra attempts for a transfer that failed with a transient error
    pub transfer_retries: u32,
    /// Backoff before the first retry; doubled on each further attempt
    pub retry_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: "ebank.db".to_string(),
            max_connections: 8,
            lock_timeout: Duration::from_secs(5),
            transfer_deadline: Duration::from_secs(10),
            transfer_retries: 2,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl LedgerConfig {
    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_transfer_deadline(mut self, deadline: Duration) -> Self {
        self.transfer_deadline = deadline;
        self
    }

    pub fn with_transfer_retries(mut self, retries: u32) -> Self {
        self.transfer_retries = retries;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Backoff to wait before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(10);
        self.retry_backoff.saturating_mul(factor)
    }
}
