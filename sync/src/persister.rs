//! Persister: replay a transaction, then write the responses back.
//!
//! The same persister serves a collection's online and optimistic mutations
//! and the offline runtime's replay of queued transactions.

use ferry_transaction::Transaction;
use tracing::info;

use crate::endpoints::MutationsMap;
use crate::error::SyncResult;
use crate::pipeline::{execute, MutationResponse};
use crate::store::LocalWriter;
use crate::write_back::ApplyWrite;

#[derive(Debug, Clone)]
pub struct Persister {
    mutations: MutationsMap,
    applier: ApplyWrite,
}

impl Persister {
    pub fn new(mutations: MutationsMap, applier: ApplyWrite) -> Self {
        Self { mutations, applier }
    }

    pub fn mutations(&self) -> &MutationsMap {
        &self.mutations
    }

    /// Replay `transaction` and apply the collected responses to `store`.
    ///
    /// Nothing is written locally unless every mutation of the transaction
    /// succeeded remotely. Once written back, the transaction's local state is
    /// released from `store`.
    pub async fn persist(
        &self,
        transaction: &Transaction,
        idempotency_key: &str,
        store: &dyn LocalWriter,
    ) -> SyncResult<Vec<MutationResponse>> {
        let responses = execute(transaction, &self.mutations, idempotency_key).await?;
        self.applier.apply_write(&responses, store)?;
        store.release(transaction.mutations());

        info!(
            transaction = %transaction.id,
            mutations = responses.len(),
            "transaction persisted"
        );
        Ok(responses)
    }
}
