//! Error types for tupledb
//!
//! One unified `Error` enum crosses every layer. The retry wrapper in the
//! client recovers `ReadWriteConflict` locally; everything else surfaces
//! to the caller.

use crate::codec::DecodeError;
use crate::id::TxId;
use crate::tuple::Tuple;
use thiserror::Error;

/// Result type alias for tupledb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tupledb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A commit was rejected because a concurrently-committed write fell
    /// inside this transaction's recorded read range. Retryable.
    #[error("read-write conflict for transaction {tx_id}")]
    ReadWriteConflict {
        /// The transaction whose commit was rejected
        tx_id: TxId,
    },

    /// Operation on a transaction that already committed or canceled.
    #[error("transaction is already {state}")]
    TransactionClosed {
        /// Terminal state the transaction is in ("committed"/"canceled")
        state: &'static str,
    },

    /// `get()` observed more than one value at a single-tuple range,
    /// an invariant violation in writer code.
    #[error("expected a single value at {key:?}, found {found}")]
    GetExpectedSingle {
        /// The point key that was read
        key: Tuple,
        /// How many pairs the scan returned
        found: usize,
    },

    /// Malformed encoded tuple.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A tuple handed back by the engine did not extend the expected
    /// subspace prefix.
    #[error("tuple {tuple:?} does not extend subspace prefix {prefix:?}")]
    SubspaceMismatch {
        /// The expected prefix
        prefix: Tuple,
        /// The offending tuple
        tuple: Tuple,
    },

    /// Propagated from the storage backend; never retried by the core.
    #[error("storage error: {message}")]
    Storage {
        /// Backend-supplied description
        message: String,
    },
}

impl Error {
    /// Create a read-write conflict error.
    pub fn conflict(tx_id: TxId) -> Self {
        Error::ReadWriteConflict { tx_id }
    }

    /// Create a transaction-closed error.
    pub fn transaction_closed(state: &'static str) -> Self {
        Error::TransactionClosed { state }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
        }
    }

    /// True for `ReadWriteConflict`, the one retryable error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ReadWriteConflict { .. })
    }

    /// True for operations on an already-closed transaction.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::TransactionClosed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;

    #[test]
    fn test_conflict_classification() {
        let conflict = Error::conflict(TxId::new());
        assert!(conflict.is_conflict());
        assert!(!conflict.is_closed());
        assert!(!Error::storage("disk unplugged").is_conflict());
    }

    #[test]
    fn test_display_messages() {
        let id = TxId::new();
        assert!(Error::conflict(id).to_string().contains(&id.to_string()));
        assert_eq!(
            Error::transaction_closed("committed").to_string(),
            "transaction is already committed"
        );
        let single = Error::GetExpectedSingle {
            key: tuple!["k"],
            found: 3,
        };
        assert!(single.to_string().contains("found 3"));
    }

    #[test]
    fn test_decode_error_wraps_transparently() {
        let err: Error = DecodeError::UnexpectedEnd.into();
        assert_eq!(err.to_string(), "unexpected end of encoded tuple");
    }
}
