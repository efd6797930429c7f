//! Translation of driver errors into storage outcomes the ledger can act on.
//!
//! This is the only place that inspects SQLite result codes. Everything above
//! the storage layer sees a [`StoreError`] and never a raw `sqlx::Error`.
//!
//! | sqlx error | SQLite code (primary) | StoreError |
//! |------------|-----------------------|------------|
//! | Database | `SQLITE_BUSY` (5), `SQLITE_LOCKED` (6) | `Busy` |
//! | Database | unique / primary key constraint | `UniqueViolation` |
//! | Database | other `SQLITE_CONSTRAINT` (19) incl. triggers | `ConstraintViolation` |
//! | Database | anything else | `Database` |
//! | Io, PoolTimedOut, PoolClosed, WorkerCrashed | n/a | `ConnectionLost` |
//! | other | n/a | `Database` |

use thiserror::Error;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database is locked during {operation}")]
    Busy { operation: String },

    #[error("connection lost during {operation}: {detail}")]
    ConnectionLost { operation: String, detail: String },

    #[error("unique constraint violated during {operation}: {detail}")]
    UniqueViolation { operation: String, detail: String },

    #[error("constraint violated during {operation}: {detail}")]
    ConstraintViolation { operation: String, detail: String },

    #[error("database error during {operation}: {detail}")]
    Database { operation: String, detail: String },

    #[error("invalid row data: {0:#}")]
    Decode(#[from] anyhow::Error),
}

/// Map a `sqlx::Error` raised by `operation` into a [`StoreError`].
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let operation = operation.to_string();
    match err {
        sqlx::Error::Database(db_err) => {
            let detail = db_err.message().to_string();
            let primary_code = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);

            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation { operation, detail };
            }

            match primary_code {
                Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => StoreError::Busy { operation },
                Some(SQLITE_CONSTRAINT) => StoreError::ConstraintViolation { operation, detail },
                _ => StoreError::Database { operation, detail },
            }
        }
        sqlx::Error::Io(e) => StoreError::ConnectionLost {
            operation,
            detail: e.to_string(),
        },
        sqlx::Error::PoolTimedOut => StoreError::ConnectionLost {
            operation,
            detail: "timed out waiting for a pooled connection".to_string(),
        },
        sqlx::Error::PoolClosed => StoreError::ConnectionLost {
            operation,
            detail: "connection pool closed".to_string(),
        },
        sqlx::Error::WorkerCrashed => StoreError::ConnectionLost {
            operation,
            detail: "database worker crashed".to_string(),
        },
        other => StoreError::Database {
            operation,
            detail: other.to_string(),
        },
    }
}
