//! Ferry Mutation
//!
//! Pending mutation records and the merge engine that collapses two pending
//! edits of the same entity into their net effect.
//!
//! Responsibilities:
//! - Describe one pending insert/update/delete (`PendingMutation`)
//! - Derive field-level changes from the before/after snapshots
//! - Keep the reserved delivery `context` apart from caller metadata
//! - Merge two mutations of the same entity (or cancel them)
//!
//! # Module Structure
//!
//! - `record` - PendingMutation and MutationType
//! - `diff` - Field-level change computation
//! - `metadata` - Caller metadata plus the delivery strategy context
//! - `merge` - The merge truth table
//! - `error` - Error types for mutation failures

mod diff;
mod error;
mod merge;
mod metadata;
mod record;

pub use diff::diff;
pub use error::{MutationError, MutationResult};
pub use merge::merge;
pub use metadata::{check_metadata, DeliveryStrategy, MutationMetadata, RESERVED_CONTEXT_KEY};
pub use record::{MutationType, PendingMutation};
