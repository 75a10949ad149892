//! Outbox error types.

use ferry_core::TransactionId;
use ferry_sync::SyncError;
use ferry_transaction::TransactionError;
use thiserror::Error;

/// Outbox errors.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Another context owns the backlog.
    #[error("not the leader, replay belongs to another context")]
    NotLeader,

    /// A queued transaction names a sync function nobody registered.
    #[error("no sync function registered as '{name}'")]
    UnknownSyncFn { name: String },

    /// Consolidation of the backlog failed; the backlog is left as it was.
    #[error("consolidation failed: {0}")]
    Consolidation(#[from] TransactionError),

    /// The replay of a transaction broke a contract; it was dropped from the
    /// backlog.
    #[error("transaction {id} rejected: {source}")]
    Rejected {
        id: TransactionId,
        #[source]
        source: SyncError,
    },
}

impl OutboxError {
    pub fn unknown_sync_fn(name: impl Into<String>) -> Self {
        Self::UnknownSyncFn { name: name.into() }
    }

    pub fn rejected(id: TransactionId, source: SyncError) -> Self {
        Self::Rejected { id, source }
    }
}

/// Result type for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;
