//! Backlog entries.

use std::time::Duration;

use ferry_core::TransactionId;
use ferry_transaction::Transaction;

/// A committed transaction waiting for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTransaction {
    pub transaction: Transaction,
    /// Sync function the transaction is replayed with.
    pub mutation_fn_name: String,
    /// Failed replays so far.
    pub attempts: u32,
    /// Delay the scheduler should wait before the next replay.
    pub retry_delay: Option<Duration>,
}

impl QueuedTransaction {
    pub fn new(transaction: Transaction, mutation_fn_name: impl Into<String>) -> Self {
        Self {
            transaction,
            mutation_fn_name: mutation_fn_name.into(),
            attempts: 0,
            retry_delay: None,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.transaction.id
    }
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStats {
    /// Transactions in the backlog when the pass started.
    pub queued: usize,
    /// Transactions left after consolidation.
    pub consolidated: usize,
    /// Transactions confirmed and written back.
    pub replayed: usize,
    /// Transactions still in the backlog after the pass.
    pub remaining: usize,
    /// Transaction whose replay failed transiently and will be retried.
    pub failed: Option<TransactionId>,
    /// Transaction dropped after exhausting its retries.
    pub abandoned: Option<TransactionId>,
}
