//! Local writer that only records batches.

use std::cell::RefCell;

use ferry_sync::{LocalWriter, SyncResult, WriteBatch, WriteOp};

#[derive(Debug, Default)]
pub struct BatchLog {
    batches: RefCell<Vec<WriteBatch>>,
}

impl BatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.borrow().len()
    }

    /// Every op written so far, batches flattened in order.
    pub fn ops(&self) -> Vec<WriteOp> {
        self.batches
            .borrow()
            .iter()
            .flat_map(|batch| batch.ops().to_vec())
            .collect()
    }
}

impl LocalWriter for BatchLog {
    fn write_batch(&self, batch: WriteBatch) -> SyncResult<()> {
        self.batches.borrow_mut().push(batch);
        Ok(())
    }
}
