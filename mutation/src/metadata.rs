//! Mutation metadata.
//!
//! Callers attach free-form annotations to a mutation. The delivery strategy
//! that produced the mutation is kept in a separate `context` field that
//! callers can never set: annotations carrying a `context` key are rejected.

use ferry_core::Fields;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MutationError, MutationResult};

/// Annotation key reserved for the delivery strategy.
pub const RESERVED_CONTEXT_KEY: &str = "context";

/// How a user-initiated edit reaches the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStrategy {
    /// Wait for remote confirmation before the change is visible.
    Online,
    /// Show the change locally right away, confirm remotely in the background.
    Optimistic,
    /// Queue the change in the offline backlog and replay it later.
    Offline,
}

impl DeliveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStrategy::Online => "online",
            DeliveryStrategy::Optimistic => "optimistic",
            DeliveryStrategy::Offline => "offline",
        }
    }
}

impl fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject caller annotations that try to set the reserved `context` key.
pub fn check_metadata(annotations: &Fields) -> MutationResult<()> {
    if annotations.contains_key(RESERVED_CONTEXT_KEY) {
        return Err(MutationError::reserved_metadata_key(RESERVED_CONTEXT_KEY));
    }
    Ok(())
}

/// Caller annotations plus the engine-owned delivery context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<DeliveryStrategy>,
    #[serde(flatten)]
    annotations: Fields,
}

impl MutationMetadata {
    /// Wrap caller annotations, failing if they collide with the reserved key.
    pub fn new(annotations: Fields) -> MutationResult<Self> {
        check_metadata(&annotations)?;
        Ok(Self {
            context: None,
            annotations,
        })
    }

    /// Stamp the delivery strategy.
    pub fn with_context(mut self, strategy: DeliveryStrategy) -> Self {
        self.context = Some(strategy);
        self
    }

    pub fn context(&self) -> Option<DeliveryStrategy> {
        self.context
    }

    pub fn annotations(&self) -> &Fields {
        &self.annotations
    }

    /// What the remote endpoint receives: the annotations without the context.
    pub fn for_remote(&self) -> Fields {
        self.annotations.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_none() && self.annotations.is_empty()
    }
}
