//! Merge engine - combines two pending mutations of the same entity.
//!
//! Truth table, `existing`-`incoming` in chronological order:
//!
//! | existing | incoming | result                                         |
//! |----------|----------|------------------------------------------------|
//! | insert   | update   | insert carrying the latest snapshot            |
//! | insert   | delete   | nothing: both cancel out                       |
//! | update   | delete   | incoming delete                                |
//! | update   | update   | incoming update keeping the first pre-image    |
//! | delete   | delete   | incoming                                       |
//! | insert   | insert   | incoming                                       |
//!
//! Every other pair (an update or insert after a delete, an insert after an
//! update) means the store queued work against an entity it had already
//! deleted or created, and fails with [`MutationError::UnmergeablePair`].

use ferry_core::Fields;

use crate::error::{MutationError, MutationResult};
use crate::record::{MutationType, PendingMutation};

/// Merge `incoming` into `existing`.
///
/// Returns `Ok(None)` when the two mutations cancel each other. Both records
/// must target the same global key.
pub fn merge(
    existing: PendingMutation,
    incoming: PendingMutation,
) -> MutationResult<Option<PendingMutation>> {
    if existing.global_key != incoming.global_key {
        return Err(MutationError::global_key_mismatch(
            existing.global_key,
            incoming.global_key,
        ));
    }

    match (existing.mutation_type, incoming.mutation_type) {
        (MutationType::Insert, MutationType::Update) => Ok(Some(PendingMutation {
            mutation_type: MutationType::Insert,
            // Keys are immutable, so the insert keeps its own.
            key: existing.key,
            global_key: existing.global_key,
            original: Fields::new(),
            modified: incoming.modified,
            changes: union(existing.changes, incoming.changes),
            metadata: incoming.metadata.or(existing.metadata),
            sync_metadata: union(existing.sync_metadata, incoming.sync_metadata),
            mutation_id: incoming.mutation_id,
            updated_at: incoming.updated_at,
        })),

        (MutationType::Insert, MutationType::Delete) => Ok(None),

        (MutationType::Update, MutationType::Delete) => Ok(Some(incoming)),

        (MutationType::Update, MutationType::Update) => Ok(Some(PendingMutation {
            original: existing.original,
            changes: union(existing.changes, incoming.changes),
            metadata: incoming.metadata.or(existing.metadata),
            sync_metadata: union(existing.sync_metadata, incoming.sync_metadata),
            ..incoming
        })),

        (MutationType::Delete, MutationType::Delete)
        | (MutationType::Insert, MutationType::Insert) => Ok(Some(incoming)),

        (MutationType::Delete, MutationType::Insert | MutationType::Update)
        | (MutationType::Update, MutationType::Insert) => Err(MutationError::unmergeable_pair(
            existing.mutation_type,
            incoming.mutation_type,
        )),
    }
}

/// Shallow union, later entries win.
fn union(mut base: Fields, later: Fields) -> Fields {
    base.extend(later);
    base
}
