//! Sync error types.

use ferry_core::{CoreError, Key};
use ferry_mutation::MutationType;
use thiserror::Error;

/// Failure reported by a remote endpoint call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An endpoint call rejected. The transaction stays queued.
    #[error("{mutation_type} of '{key}' failed remotely: {source}")]
    Remote {
        mutation_type: MutationType,
        key: Key,
        #[source]
        source: RemoteError,
    },

    /// The endpoint answered without the affected records.
    #[error("{mutation_type} response carried no records")]
    EmptyResponse { mutation_type: MutationType },

    /// A returned record has no extractable key.
    #[error("{mutation_type} response record has no key: {source}")]
    MissingKey {
        mutation_type: MutationType,
        #[source]
        source: CoreError,
    },

    /// No endpoint is registered for a mutation type.
    #[error("no endpoint registered for {mutation_type}")]
    MissingEndpoint { mutation_type: MutationType },

    /// The local store refused a write batch.
    #[error("local store write failed: {message}")]
    Store { message: String },
}

impl SyncError {
    pub fn remote(mutation_type: MutationType, key: Key, source: RemoteError) -> Self {
        Self::Remote {
            mutation_type,
            key,
            source,
        }
    }

    pub fn empty_response(mutation_type: MutationType) -> Self {
        Self::EmptyResponse { mutation_type }
    }

    pub fn missing_key(mutation_type: MutationType, source: CoreError) -> Self {
        Self::MissingKey {
            mutation_type,
            source,
        }
    }

    pub fn missing_endpoint(mutation_type: MutationType) -> Self {
        Self::MissingEndpoint { mutation_type }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Backend or programming contract broken; retrying cannot help.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse { .. } | Self::MissingKey { .. } | Self::MissingEndpoint { .. }
        )
    }

    /// Transient failure; the runtime may replay the transaction later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
