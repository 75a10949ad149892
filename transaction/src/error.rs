//! Transaction error types.

use ferry_core::GlobalKey;
use ferry_mutation::MutationError;
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Two queued mutations of one entity cannot be merged. Fatal for the
    /// whole consolidation pass.
    #[error("cannot consolidate mutations of {global_key}: {source}")]
    Merge {
        global_key: GlobalKey,
        #[source]
        source: MutationError,
    },
}

impl TransactionError {
    pub fn merge(global_key: GlobalKey, source: MutationError) -> Self {
        Self::Merge { global_key, source }
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
