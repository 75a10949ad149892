//! Delivery strategies.
//!
//! One dispatch for the three strategies, parameterized by the operation:
//!
//! - online: mutate without optimism, wait for the remote confirmation
//! - optimistic: mutate optimistically, hand back the in-flight handle
//! - offline: queue the mutation in a new auto-committed offline transaction

use std::fmt;
use std::rc::Rc;

use ferry_core::{Fields, Key};
use ferry_mutation::{DeliveryStrategy, MutationMetadata, MutationType, PendingMutation};
use tracing::debug;

use crate::error::ActionResult;
use crate::runtime::{
    LocalCollection, MutationHandle, MutationOptions, OfflineRuntime, OfflineTransaction,
    OfflineTransactionOptions,
};

/// Operation a collection action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    pub fn mutation_type(self) -> MutationType {
        match self {
            OperationKind::Insert => MutationType::Insert,
            OperationKind::Update => MutationType::Update,
            OperationKind::Delete => MutationType::Delete,
        }
    }

    /// Name of the action exposing the operation.
    pub fn action_name(self) -> &'static str {
        match self {
            OperationKind::Insert => "add_one",
            OperationKind::Update => "update_one",
            OperationKind::Delete => "delete_one",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}

/// Outcome of a dispatched action.
pub enum Dispatched {
    /// Confirmed remotely and written back (online).
    Persisted(Vec<PendingMutation>),
    /// Visible locally, confirmation still in flight (optimistic).
    Optimistic(MutationHandle),
    /// Queued in the offline runtime's backlog (offline).
    Queued(Rc<dyn OfflineTransaction>),
}

impl Dispatched {
    pub fn strategy(&self) -> DeliveryStrategy {
        match self {
            Dispatched::Persisted(_) => DeliveryStrategy::Online,
            Dispatched::Optimistic(_) => DeliveryStrategy::Optimistic,
            Dispatched::Queued(_) => DeliveryStrategy::Offline,
        }
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Persisted(mutations) => f.debug_tuple("Persisted").field(mutations).finish(),
            Dispatched::Optimistic(handle) => f.debug_tuple("Optimistic").field(handle).finish(),
            Dispatched::Queued(tx) => f.debug_tuple("Queued").field(&tx.id()).finish(),
        }
    }
}

/// One requested change, before a strategy delivers it.
#[derive(Debug, Clone)]
pub(crate) enum Operation {
    Insert(Fields),
    Update { key: Key, changes: Fields },
    Delete(Key),
}

impl Operation {
    pub(crate) fn kind(&self) -> OperationKind {
        match self {
            Operation::Insert(_) => OperationKind::Insert,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    /// Issue the operation against the local store.
    fn apply(
        &self,
        collection: &dyn LocalCollection,
        options: MutationOptions,
    ) -> ActionResult<MutationHandle> {
        match self {
            Operation::Insert(data) => collection.insert(data.clone(), options),
            Operation::Update { key, changes } => collection.update(key, options, &mut |draft| {
                draft.extend(changes.clone());
            }),
            Operation::Delete(key) => collection.delete(key, options),
        }
    }
}

/// Targets every strategy delivers through.
pub(crate) struct Delivery<'a> {
    pub(crate) collection: &'a dyn LocalCollection,
    pub(crate) runtime: &'a dyn OfflineRuntime,
    pub(crate) mutation_fn_name: &'a str,
}

impl Delivery<'_> {
    pub(crate) async fn dispatch(
        &self,
        strategy: DeliveryStrategy,
        operation: Operation,
        annotations: Fields,
    ) -> ActionResult<Dispatched> {
        let metadata = MutationMetadata::new(annotations)?.with_context(strategy);
        debug!(
            collection = self.collection.name(),
            operation = %operation.kind(),
            %strategy,
            "dispatching action"
        );

        match strategy {
            DeliveryStrategy::Online => {
                let handle = operation.apply(self.collection, MutationOptions::online(metadata))?;
                Ok(Dispatched::Persisted(handle.persisted().await?))
            }
            DeliveryStrategy::Optimistic => {
                let handle =
                    operation.apply(self.collection, MutationOptions::optimistic(metadata))?;
                Ok(Dispatched::Optimistic(handle))
            }
            DeliveryStrategy::Offline => {
                let tx = self.runtime.create_offline_transaction(OfflineTransactionOptions {
                    mutation_fn_name: self.mutation_fn_name.to_string(),
                    auto_commit: true,
                });
                let collection = self.collection;
                tx.mutate(Box::new(move || {
                    operation.apply(collection, MutationOptions::queued(metadata))
                }))?;
                Ok(Dispatched::Queued(tx))
            }
        }
    }
}
