//! Transactions: ordered groups of pending mutations created together.

use ferry_core::{GlobalKey, Timestamp, TransactionId};
use ferry_mutation::PendingMutation;

/// An ordered batch of pending mutations, replayed as a unit.
///
/// `created_at` orders transactions relative to each other only. Mutations
/// inside one transaction keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Creation time in milliseconds since the epoch.
    pub created_at: Timestamp,
    mutations: Vec<PendingMutation>,
    keys: Vec<GlobalKey>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new(id: TransactionId, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at,
            mutations: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Create a transaction holding `mutations`.
    pub fn with_mutations(
        id: TransactionId,
        created_at: Timestamp,
        mutations: Vec<PendingMutation>,
    ) -> Self {
        let mut tx = Self::new(id, created_at);
        tx.replace_mutations(mutations);
        tx
    }

    /// Append a mutation (further edits before the transaction is sent).
    pub fn push(&mut self, mutation: PendingMutation) {
        self.keys.push(mutation.global_key.clone());
        self.mutations.push(mutation);
    }

    /// Swap the mutation set and recompute `keys`.
    pub(crate) fn replace_mutations(&mut self, mutations: Vec<PendingMutation>) {
        self.keys = mutations.iter().map(|m| m.global_key.clone()).collect();
        self.mutations = mutations;
    }

    /// Move the mutations out, leaving the transaction empty.
    pub(crate) fn take_mutations(&mut self) -> Vec<PendingMutation> {
        self.keys.clear();
        std::mem::take(&mut self.mutations)
    }

    /// Mutations in insertion order.
    pub fn mutations(&self) -> &[PendingMutation] {
        &self.mutations
    }

    /// Global keys of the current mutations, in the same order.
    pub fn keys(&self) -> &[GlobalKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// The string sent to remote endpoints so a retried replay of this
    /// transaction can be deduplicated.
    pub fn idempotency_key(&self) -> String {
        self.id.to_string()
    }
}
