//! Common error types for Ferry.

use thiserror::Error;

/// Errors raised while handling entity records and their identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The record carries no usable key under the configured field.
    #[error("record has no usable key in field '{field}'")]
    MissingKey { field: String },

    /// A custom key extractor returned nothing for a record.
    #[error("key extractor returned no key for record")]
    KeyNotExtracted,
}

impl CoreError {
    pub fn missing_key(field: impl Into<String>) -> Self {
        Self::MissingKey {
            field: field.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
