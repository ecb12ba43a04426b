//! Error types for the housing store and fetchers.

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The refresh transaction could not commit; the prior generation
    /// remains authoritative.
    #[error("Cache write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    pub fn transaction_failed(reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            reason: reason.into(),
        }
    }

    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// External fetch errors.
///
/// Callers recover from these by serving whatever is currently cached,
/// even if stale; only an empty cache turns them into a user-facing
/// failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Upstream request failed: {reason}")]
    Upstream { reason: String },

    #[error("Upstream returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Upstream payload could not be parsed: {reason}")]
    Payload { reason: String },
}

impl FetchError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::Upstream {
            reason: reason.into(),
        }
    }

    pub fn payload(reason: impl Into<String>) -> Self {
        Self::Payload {
            reason: reason.into(),
        }
    }
}
