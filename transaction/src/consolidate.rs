//! Backlog consolidation.
//!
//! Applies the merge engine across every queued transaction of one
//! collection so each entity is replayed with its net effect only:
//!
//! 1. Sort transactions by creation time (stable: ties keep their order)
//! 2. Flatten their mutations into slots, in (transaction, position) order
//! 3. Partition slots by global key
//! 4. Fold each partition left to right with `merge`; the merged record stays
//!    in the partition's first slot, every folded slot is consumed
//! 5. Rebuild each transaction from the slots that survived
//! 6. Drop transactions left without mutations
//!
//! Examples:
//! - insert(x) + delete(x) -> both cancelled, no transaction left
//! - insert(x) + update(x) -> one insert with the latest snapshot
//! - update(x) + update(x) -> one update spanning both changes
//! - update(x) + delete(x) -> one delete

use std::collections::HashMap;

use ferry_core::GlobalKey;
use ferry_mutation::{merge, PendingMutation};
use tracing::{debug, info, warn};

use crate::error::{TransactionError, TransactionResult};
use crate::transaction::Transaction;

/// Position of a mutation: (transaction index after sorting, index within it).
type Slot = (usize, usize);

/// Consolidate a backlog of not-yet-replayed transactions.
///
/// Assumes single-writer access to the backlog for the duration of the call.
/// A merge failure aborts the whole pass.
pub fn consolidate(transactions: Vec<Transaction>) -> TransactionResult<Vec<Transaction>> {
    if transactions.is_empty() {
        return Ok(transactions);
    }

    if transactions.len() == 1 {
        debug!("single transaction, normalizing without consolidation");
        return Ok(transactions.into_iter().map(normalize).collect());
    }

    let input_count = transactions.len();
    let mut sorted = transactions;
    sorted.sort_by_key(|tx| tx.created_at);

    // Move every mutation into its slot so merged records can be owned.
    let mut pending: HashMap<Slot, PendingMutation> = HashMap::new();
    let mut partitions: Vec<(GlobalKey, Vec<Slot>)> = Vec::new();
    let mut partition_index: HashMap<GlobalKey, usize> = HashMap::new();
    let mut lengths = Vec::with_capacity(sorted.len());

    for (tx_index, tx) in sorted.iter_mut().enumerate() {
        lengths.push(tx.len());
        for (mutation_index, mutation) in tx.take_mutations().into_iter().enumerate() {
            let slot = (tx_index, mutation_index);
            let index = *partition_index
                .entry(mutation.global_key.clone())
                .or_insert_with(|| {
                    partitions.push((mutation.global_key.clone(), Vec::new()));
                    partitions.len() - 1
                });
            partitions[index].1.push(slot);
            pending.insert(slot, mutation);
        }
    }

    let mut survivors: HashMap<Slot, PendingMutation> = HashMap::new();
    let mut consumed = 0usize;

    for (global_key, slots) in partitions {
        debug!(%global_key, mutations = slots.len(), "consolidating partition");

        let mut slots = slots.into_iter();
        let Some(anchor) = slots.next() else {
            continue;
        };
        let Some(first) = pending.remove(&anchor) else {
            continue;
        };
        let mut result = Some(first.with_recomputed_changes());

        for slot in slots.by_ref() {
            let Some(incoming) = pending.remove(&slot) else {
                continue;
            };
            let Some(current) = result.take() else {
                break;
            };
            consumed += 1;
            let incoming = incoming.with_recomputed_changes();
            let (existing_type, incoming_type) = (current.mutation_type, incoming.mutation_type);

            match merge(current, incoming) {
                Ok(Some(merged)) => {
                    debug!(%global_key, %existing_type, %incoming_type, result = %merged.mutation_type, "merged");
                    result = Some(merged);
                }
                Ok(None) => {
                    debug!(%global_key, %existing_type, %incoming_type, "cancelled");
                    consumed += 1;
                    break;
                }
                Err(source) => return Err(TransactionError::merge(global_key, source)),
            }
        }

        // Folding stops at a cancellation; later slots of the partition have
        // no merged result to map to and are dropped with it.
        let dropped = slots.filter(|slot| pending.remove(slot).is_some()).count();
        if dropped > 0 {
            warn!(%global_key, dropped, "mutations after a cancelled insert were discarded");
            consumed += dropped;
        }

        if let Some(merged) = result {
            survivors.insert(anchor, merged);
        }
    }

    let mut consolidated = Vec::with_capacity(sorted.len());
    for (tx_index, mut tx) in sorted.into_iter().enumerate() {
        let mutations: Vec<PendingMutation> = (0..lengths[tx_index])
            .filter_map(|mutation_index| survivors.remove(&(tx_index, mutation_index)))
            .map(PendingMutation::with_derived_key)
            .collect();

        if mutations.is_empty() {
            debug!(transaction = %tx.id, "transaction removed, no mutations left");
            continue;
        }
        tx.replace_mutations(mutations);
        consolidated.push(tx);
    }

    info!(
        input = input_count,
        output = consolidated.len(),
        consumed,
        "consolidated offline transactions"
    );

    Ok(consolidated)
}

fn normalize(mut tx: Transaction) -> Transaction {
    let mutations = tx
        .take_mutations()
        .into_iter()
        .map(PendingMutation::normalized)
        .collect();
    tx.replace_mutations(mutations);
    tx
}
