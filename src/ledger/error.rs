//! Ledger Error Types
//!
//! Every failure surfaced by the repositories, the stores and the transfer
//! coordinator is classified into one of these kinds before it leaves the
//! ledger module.

use std::fmt;

use thiserror::Error;

/// Classified ledger error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient store failure. Callers may retry the whole operation.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Error kind without payload, for matching and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Conflict,
    Unavailable,
    Internal,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Unavailable(_) => ErrorKind::Unavailable,
            LedgerError::Internal(_) => ErrorKind::Internal,
            LedgerError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Only `Unavailable` is safe to retry: the unit of work was rolled back
    /// and nothing about the request itself was wrong.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            LedgerError::NotFound(m)
            | LedgerError::InvalidArgument(m)
            | LedgerError::Conflict(m)
            | LedgerError::Unavailable(m)
            | LedgerError::Internal(m)
            | LedgerError::Cancelled(m) => m,
        }
    }

    /// Prefix the message with the operation that failed, keeping the kind.
    pub fn context(self, ctx: impl fmt::Display) -> Self {
        let wrap = |m: String| format!("{}: {}", ctx, m);
        match self {
            LedgerError::NotFound(m) => LedgerError::NotFound(wrap(m)),
            LedgerError::InvalidArgument(m) => LedgerError::InvalidArgument(wrap(m)),
            LedgerError::Conflict(m) => LedgerError::Conflict(wrap(m)),
            LedgerError::Unavailable(m) => LedgerError::Unavailable(wrap(m)),
            LedgerError::Internal(m) => LedgerError::Internal(wrap(m)),
            LedgerError::Cancelled(m) => LedgerError::Cancelled(wrap(m)),
        }
    }

    pub(crate) fn account_not_found(id: i64) -> Self {
        LedgerError::NotFound(format!("account {} not found", id))
    }

    /// Foreign-key violations on delete mean the row is still referenced.
    pub(crate) fn on_delete(self) -> Self {
        match self {
            LedgerError::NotFound(m) if m.starts_with("referenced") => {
                LedgerError::Conflict(m.replacen("referenced", "still referenced", 1))
            }
            other => other,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind as DbKind;

        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) => {
                let msg = db.message().to_string();
                match db.kind() {
                    DbKind::UniqueViolation => LedgerError::Conflict(msg),
                    DbKind::ForeignKeyViolation => {
                        LedgerError::NotFound(format!("referenced row: {}", msg))
                    }
                    DbKind::CheckViolation | DbKind::NotNullViolation => {
                        LedgerError::InvalidArgument(msg)
                    }
                    _ => match db.code().as_deref() {
                        // serialization_failure, deadlock_detected
                        Some("40001") | Some("40P01") => LedgerError::Unavailable(msg),
                        // numeric_value_out_of_range
                        Some("22003") => LedgerError::InvalidArgument(msg),
                        _ => LedgerError::Internal(msg),
                    },
                }
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => LedgerError::Unavailable(err.to_string()),
            other => LedgerError::Internal(other.to_string()),
        }
    }
}
