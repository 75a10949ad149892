//! Collection error types.

use ferry_core::{CoreError, Key, TransactionId};
use ferry_mutation::{MutationError, MutationType};
use ferry_sync::{RemoteError, SyncError};
use thiserror::Error;

use crate::strategy::OperationKind;

/// Errors raised by collection actions and local store mutations.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No strategy is configured for the operation.
    #[error("{operation} is not configured for collection '{collection}'")]
    NotConfigured {
        collection: String,
        operation: OperationKind,
    },

    /// Caller metadata tried to set the reserved key.
    #[error("\"{key}\" property is reserved in metadata object")]
    ReservedMetadataKey { key: String },

    /// Update or delete of a key the store does not hold.
    #[error("'{key}' not found in collection '{collection}'")]
    NotFound { collection: String, key: Key },

    /// Insert of a key the store already holds.
    #[error("'{key}' already exists in collection '{collection}'")]
    DuplicateKey { collection: String, key: Key },

    /// Mutation attempted on an already committed offline transaction.
    #[error("offline transaction {id} is already committed")]
    TransactionClosed { id: TransactionId },

    /// The task running a remote round trip ended without reporting back.
    #[error("persist of transaction {id} was aborted")]
    PersistAborted { id: TransactionId },

    /// The initial snapshot could not be loaded.
    #[error("initial load of collection '{collection}' failed: {source}")]
    InitialLoad {
        collection: String,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Mutation(MutationError),

    #[error(transparent)]
    Key(#[from] CoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ActionError {
    pub fn not_configured(collection: impl Into<String>, operation: OperationKind) -> Self {
        Self::NotConfigured {
            collection: collection.into(),
            operation,
        }
    }

    pub fn not_found(collection: impl Into<String>, key: Key) -> Self {
        Self::NotFound {
            collection: collection.into(),
            key,
        }
    }

    pub fn duplicate_key(collection: impl Into<String>, key: Key) -> Self {
        Self::DuplicateKey {
            collection: collection.into(),
            key,
        }
    }

    pub fn persist_aborted(id: TransactionId) -> Self {
        Self::PersistAborted { id }
    }

    pub fn initial_load(collection: impl Into<String>, source: RemoteError) -> Self {
        Self::InitialLoad {
            collection: collection.into(),
            source,
        }
    }

    /// Contract violations surface immediately and are never retried.
    pub fn is_contract_violation(&self) -> bool {
        match self {
            Self::ReservedMetadataKey { .. } | Self::NotConfigured { .. } => true,
            Self::Sync(e) => e.is_contract_violation(),
            _ => false,
        }
    }
}

impl From<MutationError> for ActionError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::ReservedMetadataKey { key } => Self::ReservedMetadataKey { key },
            other => Self::Mutation(other),
        }
    }
}

/// Result type for collection actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors raised while validating a collection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("collection name must not be empty")]
    EmptyName,

    /// An operation has a strategy but the API lacks its endpoint.
    #[error("collection '{collection}': {mutation_type} endpoint is missing")]
    MissingEndpoint {
        collection: String,
        mutation_type: MutationType,
    },

    #[error("invalid collection config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn missing_endpoint(collection: impl Into<String>, mutation_type: MutationType) -> Self {
        Self::MissingEndpoint {
            collection: collection.into(),
            mutation_type,
        }
    }
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
