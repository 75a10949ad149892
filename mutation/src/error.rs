//! Mutation error types.

use ferry_core::GlobalKey;
use thiserror::Error;

use crate::MutationType;

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors that can occur while building or merging pending mutations.
///
/// Every variant is a contract violation: retrying cannot fix it.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Unhandled mutation combination: {existing}-{incoming}")]
    UnmergeablePair {
        existing: MutationType,
        incoming: MutationType,
    },

    #[error("Cannot merge mutations of different entities: {existing} and {incoming}")]
    GlobalKeyMismatch {
        existing: GlobalKey,
        incoming: GlobalKey,
    },

    #[error("\"{key}\" property is reserved in metadata object")]
    ReservedMetadataKey { key: String },
}

impl MutationError {
    pub fn unmergeable_pair(existing: MutationType, incoming: MutationType) -> Self {
        Self::UnmergeablePair { existing, incoming }
    }

    pub fn global_key_mismatch(existing: GlobalKey, incoming: GlobalKey) -> Self {
        Self::GlobalKeyMismatch { existing, incoming }
    }

    pub fn reserved_metadata_key(key: impl Into<String>) -> Self {
        Self::ReservedMetadataKey { key: key.into() }
    }
}
