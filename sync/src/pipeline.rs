//! Mutation execution pipeline.
//!
//! Replays one transaction against the remote API, one mutation at a time in
//! insertion order. Each call is awaited before the next is issued, and every
//! call carries the same idempotency key so the server can deduplicate a
//! retried replay. The first failure aborts the rest of the transaction.

use ferry_mutation::MutationType;
use ferry_transaction::Transaction;
use tracing::debug;

use crate::endpoints::{MutationsMap, RemoteResponse};
use crate::error::SyncResult;

/// Response of one replayed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResponse {
    pub mutation_type: MutationType,
    pub response: RemoteResponse,
}

/// Replay `transaction` in order; responses come back in call order.
pub async fn execute(
    transaction: &Transaction,
    mutations: &MutationsMap,
    idempotency_key: &str,
) -> SyncResult<Vec<MutationResponse>> {
    let mut responses = Vec::with_capacity(transaction.len());

    for mutation in transaction.mutations() {
        debug!(
            transaction = %transaction.id,
            mutation_type = %mutation.mutation_type,
            key = %mutation.key,
            context = ?mutation.metadata.as_ref().and_then(|m| m.context()),
            "executing mutation"
        );

        let response = mutations.dispatch(mutation, idempotency_key).await?;
        responses.push(MutationResponse {
            mutation_type: mutation.mutation_type,
            response,
        });
    }

    Ok(responses)
}
