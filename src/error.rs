use crate::domain::account::{AccountId, Amount, Balance};
use crate::domain::transfer::AccountRole;
use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// The closed set of failures the ledger reports to its callers.
///
/// Storage-engine specific errors are classified into [`StorageError`] before
/// they leave a store, so callers can map every variant to a stable response
/// without inspecting error text.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("account {0} already exists")]
    DuplicateAccount(AccountId),
    #[error("{side} account {id} not found")]
    NotFound { side: AccountRole, id: AccountId },
    #[error("insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Balance,
        requested: Amount,
    },
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl LedgerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::DuplicateAccount(_) => ErrorKind::DuplicateAccount,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    /// Whether re-running the whole unit of work may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageFailure(StorageError::Conflict(_)))
    }
}

/// Stable, payload-free classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DuplicateAccount,
    NotFound,
    InsufficientFunds,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::DuplicateAccount => "duplicate_account",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure failures raised by an [`AccountStore`](crate::domain::ports::AccountStore).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("deadline exceeded")]
    Timeout,
    #[error("transient conflict: {0}")]
    Conflict(String),
    #[error("lock order violated: requested account {requested} while holding {held}")]
    LockOrder {
        held: AccountId,
        requested: AccountId,
    },
    #[error("account {0} is not locked by this unit of work")]
    NotLocked(AccountId),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        use rocksdb::ErrorKind as Kind;
        match err.kind() {
            Kind::Busy | Kind::TryAgain => StorageError::Conflict(err.into_string()),
            Kind::TimedOut => StorageError::Timeout,
            _ => StorageError::Backend(Box::new(err)),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::StorageFailure(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        let id = AccountId::new(7).unwrap();
        assert_eq!(
            LedgerError::invalid("nope").kind().as_str(),
            "invalid_argument"
        );
        assert_eq!(
            LedgerError::DuplicateAccount(id).kind(),
            ErrorKind::DuplicateAccount
        );
        assert_eq!(
            LedgerError::NotFound {
                side: AccountRole::Destination,
                id
            }
            .kind()
            .to_string(),
            "not_found"
        );
        assert_eq!(
            LedgerError::from(StorageError::Timeout).kind(),
            ErrorKind::StorageFailure
        );
    }

    #[test]
    fn test_not_found_names_the_side() {
        let err = LedgerError::NotFound {
            side: AccountRole::Source,
            id: AccountId::new(999).unwrap(),
        };
        assert_eq!(err.to_string(), "source account 999 not found");
    }

    #[test]
    fn test_only_conflicts_are_transient() {
        assert!(LedgerError::from(StorageError::Conflict("busy".into())).is_transient());
        assert!(!LedgerError::from(StorageError::Timeout).is_transient());
        assert!(!LedgerError::invalid("x").is_transient());
    }
}
