//! Batched writes into the local store.

use ferry_core::{Fields, Key};
use ferry_mutation::PendingMutation;

use crate::error::SyncResult;

/// One operation of a write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace a synced record.
    Upsert(Fields),
    /// Remove a synced record by key.
    Delete(Key),
}

/// Operations the local store applies atomically, notifying its
/// subscribers once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: Fields) {
        self.ops.push(WriteOp::Upsert(record));
    }

    pub fn delete(&mut self, key: Key) {
        self.ops.push(WriteOp::Delete(key));
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Write side of the local store.
pub trait LocalWriter {
    /// Apply the whole batch or nothing.
    fn write_batch(&self, batch: WriteBatch) -> SyncResult<()>;

    /// Drop the local state `mutations` left visible ahead of the synced
    /// records. Called once their transaction was written back or failed for
    /// good.
    fn release(&self, _mutations: &[PendingMutation]) {}
}
