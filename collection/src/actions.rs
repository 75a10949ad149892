//! Collection actions: `add_one`, `update_one`, `delete_one`.

use std::rc::Rc;

use ferry_core::{Fields, Key};
use ferry_mutation::DeliveryStrategy;

use crate::config::CollectionConfig;
use crate::error::{ActionError, ActionResult};
use crate::runtime::{LocalCollection, OfflineRuntime};
use crate::strategy::{Delivery, Dispatched, Operation, OperationKind};

/// Build the actions of a collection; each operation follows the strategy
/// configured for it.
pub fn build_actions(
    config: &CollectionConfig,
    collection: Rc<dyn LocalCollection>,
    runtime: Rc<dyn OfflineRuntime>,
) -> CollectionActions {
    CollectionActions {
        name: config.name.clone(),
        mutation_fn_name: config.mutation_fn_name(),
        on_insert: config.on_insert,
        on_update: config.on_update,
        on_delete: config.on_delete,
        collection,
        runtime,
    }
}

/// User-facing mutations of one collection.
pub struct CollectionActions {
    name: String,
    mutation_fn_name: String,
    on_insert: Option<DeliveryStrategy>,
    on_update: Option<DeliveryStrategy>,
    on_delete: Option<DeliveryStrategy>,
    collection: Rc<dyn LocalCollection>,
    runtime: Rc<dyn OfflineRuntime>,
}

impl CollectionActions {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an action exists for `operation`.
    pub fn has(&self, operation: OperationKind) -> bool {
        self.strategy(operation).is_some()
    }

    pub fn strategy(&self, operation: OperationKind) -> Option<DeliveryStrategy> {
        match operation {
            OperationKind::Insert => self.on_insert,
            OperationKind::Update => self.on_update,
            OperationKind::Delete => self.on_delete,
        }
    }

    /// Create a record.
    pub async fn add_one(&self, data: Fields, metadata: Fields) -> ActionResult<Dispatched> {
        self.run(Operation::Insert(data), metadata).await
    }

    /// Shallow-assign `changes` onto the record stored under `key`.
    pub async fn update_one(
        &self,
        key: &Key,
        changes: Fields,
        metadata: Fields,
    ) -> ActionResult<Dispatched> {
        self.run(
            Operation::Update {
                key: key.clone(),
                changes,
            },
            metadata,
        )
        .await
    }

    /// Remove the record stored under `key`.
    pub async fn delete_one(&self, key: &Key, metadata: Fields) -> ActionResult<Dispatched> {
        self.run(Operation::Delete(key.clone()), metadata).await
    }

    async fn run(&self, operation: Operation, metadata: Fields) -> ActionResult<Dispatched> {
        let kind = operation.kind();
        let strategy = self
            .strategy(kind)
            .ok_or_else(|| ActionError::not_configured(self.name.clone(), kind))?;

        let delivery = Delivery {
            collection: self.collection.as_ref(),
            runtime: self.runtime.as_ref(),
            mutation_fn_name: &self.mutation_fn_name,
        };
        delivery.dispatch(strategy, operation, metadata).await
    }
}
