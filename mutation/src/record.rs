//! Pending mutation records.

use ferry_core::{Fields, GlobalKey, Key, MutationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diff::diff;
use crate::metadata::MutationMetadata;

/// Kind of change a mutation applies to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    Insert,
    Update,
    Delete,
}

impl MutationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationType::Insert => "insert",
            MutationType::Update => "update",
            MutationType::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending change to one entity.
///
/// `changes` is derived data: it always equals `diff(original, modified)`
/// once the record has been normalized, and is recomputed before any merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    #[serde(rename = "type")]
    pub mutation_type: MutationType,
    pub key: Key,
    pub global_key: GlobalKey,
    /// Snapshot before the change (empty for inserts).
    pub original: Fields,
    /// Snapshot after the change (empty for deletes).
    pub modified: Fields,
    pub changes: Fields,
    pub metadata: Option<MutationMetadata>,
    pub sync_metadata: Fields,
    pub mutation_id: MutationId,
    pub updated_at: Timestamp,
}

impl PendingMutation {
    fn new(
        mutation_type: MutationType,
        global_key: GlobalKey,
        original: Fields,
        modified: Fields,
    ) -> Self {
        let changes = diff(&original, &modified);
        Self {
            mutation_type,
            key: global_key.key(),
            global_key,
            original,
            modified,
            changes,
            metadata: None,
            sync_metadata: Fields::new(),
            mutation_id: MutationId::default(),
            updated_at: 0,
        }
    }

    /// A new entity.
    pub fn insert(global_key: GlobalKey, modified: Fields) -> Self {
        Self::new(MutationType::Insert, global_key, Fields::new(), modified)
    }

    /// A change from `original` to `modified`.
    pub fn update(global_key: GlobalKey, original: Fields, modified: Fields) -> Self {
        Self::new(MutationType::Update, global_key, original, modified)
    }

    /// Removal of an entity whose last known state was `original`.
    pub fn delete(global_key: GlobalKey, original: Fields) -> Self {
        Self::new(MutationType::Delete, global_key, original, Fields::new())
    }

    pub fn with_metadata(mut self, metadata: MutationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_sync_metadata(mut self, sync_metadata: Fields) -> Self {
        self.sync_metadata = sync_metadata;
        self
    }

    /// Set the ordering tokens.
    pub fn stamped(mut self, mutation_id: MutationId, updated_at: Timestamp) -> Self {
        self.mutation_id = mutation_id;
        self.updated_at = updated_at;
        self
    }

    /// Recompute `changes` from the snapshots.
    pub fn with_recomputed_changes(mut self) -> Self {
        self.changes = diff(&self.original, &self.modified);
        self
    }

    /// Re-derive `key` from `global_key`.
    pub fn with_derived_key(mut self) -> Self {
        self.key = self.global_key.key();
        self
    }

    /// Both derivations at once; what consolidation applies to every record it keeps.
    pub fn normalized(self) -> Self {
        self.with_recomputed_changes().with_derived_key()
    }

    /// Caller annotations to send to the remote endpoint (never the context).
    pub fn remote_metadata(&self) -> Fields {
        self.metadata
            .as_ref()
            .map(MutationMetadata::for_remote)
            .unwrap_or_default()
    }
}
