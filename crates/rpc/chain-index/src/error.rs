//! Error types for chain indexing operations.

use alloy_primitives::B256;
use kortana_rpc_types::FilterId;
use thiserror::Error;

/// Errors that can occur while indexing blocks or serving index queries.
#[derive(Debug, Error)]
pub enum ChainIndexError {
    /// A block was appended or published out of sequence.
    #[error("ordering violation: expected block {expected}, got {got}")]
    OrderingViolation { expected: u64, got: u64 },

    /// A receipt contradicts its transaction.
    #[error("inconsistent receipt for transaction {tx_hash}: {reason}")]
    InconsistentReceipt { tx_hash: B256, reason: String },

    /// Transactions and receipts do not pair up with the block's transaction list.
    #[error("mismatched block {block}: {reason}")]
    MismatchedBlock { block: u64, reason: String },

    /// A cursor refers to a block that fell out of the retention window.
    #[error("block {requested} is outside the retention window (oldest available: {oldest_available})")]
    RetentionExpired { requested: u64, oldest_available: u64 },

    /// Filter does not exist or was already destroyed.
    #[error("filter not found: {0}")]
    FilterNotFound(FilterId),

    /// The ingest lane stopped after a fatal error and accepts no more blocks.
    #[error("ingest halted at block {block}: {reason}")]
    IngestHalted { block: u64, reason: String },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// SQLite database error.
    #[error("sqlite error: {0}")]
    Sqlite(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ChainIndexError {
    /// Whether this error must stop the ingest lane.
    ///
    /// Ordering and integrity failures would corrupt the address index if
    /// indexing continued past them, as would a failed storage write.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainIndexError::OrderingViolation { .. }
                | ChainIndexError::InconsistentReceipt { .. }
                | ChainIndexError::MismatchedBlock { .. }
                | ChainIndexError::IngestHalted { .. }
                | ChainIndexError::Storage(_)
                | ChainIndexError::Sqlite(_)
                | ChainIndexError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for ChainIndexError {
    fn from(err: serde_json::Error) -> Self {
        ChainIndexError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainIndexError {
    fn from(err: rusqlite::Error) -> Self {
        ChainIndexError::Sqlite(err.to_string())
    }
}

impl From<r2d2::Error> for ChainIndexError {
    fn from(err: r2d2::Error) -> Self {
        ChainIndexError::Sqlite(err.to_string())
    }
}

/// Result type for chain indexing operations.
pub type ChainIndexResult<T> = Result<T, ChainIndexError>;
