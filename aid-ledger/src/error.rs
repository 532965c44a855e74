//! Error types for the aid ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range input; the operation had no effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// Aid request not found
    #[error("Request not found: {0}")]
    NotFound(String),

    /// Donation would push the request past its requested amount
    #[error("Donation of {requested} exceeds remaining need of {remaining}")]
    OverFunded {
        /// Amount the donor tried to give
        requested: Decimal,
        /// Amount still needed by the request
        remaining: Decimal,
    },

    /// Hash chain failed verification
    #[error("Chain integrity violated at entry {index}: {reason}")]
    ChainIntegrity {
        /// Index of the first entry that failed
        index: u64,
        /// What failed
        reason: String,
    },

    /// Appends refused after an integrity failure
    #[error("Ledger halted after integrity failure; appends are refused")]
    LedgerHalted,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// True for errors that mean the ledger can no longer be trusted
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Error::ChainIntegrity { .. } | Error::LedgerHalted)
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_funded_message() {
        let err = Error::OverFunded {
            requested: Decimal::new(500, 0),
            remaining: Decimal::new(120, 0),
        };
        assert_eq!(
            err.to_string(),
            "Donation of 500 exceeds remaining need of 120"
        );
    }

    #[test]
    fn test_integrity_classification() {
        assert!(Error::LedgerHalted.is_integrity_failure());
        assert!(Error::ChainIntegrity {
            index: 3,
            reason: "hash mismatch".to_string()
        }
        .is_integrity_failure());
        assert!(!Error::validation("amount must be positive").is_integrity_failure());
    }
}
