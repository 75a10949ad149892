//! A collection wired to a recording API and an in-memory outbox.

use std::rc::Rc;

use ferry_collection::{
    create_collection, CollectionActions, CollectionConfig, DeliveryStrategy, MemoryCollection,
    OfflineCollection,
};
use ferry_core::Fields;
use ferry_outbox::MemoryOutbox;

use crate::api::RecordingApi;
use crate::builders::COLLECTION;

pub struct Harness {
    pub api: Rc<RecordingApi>,
    pub wrapper: OfflineCollection,
    pub outbox: MemoryOutbox,
    pub actions: CollectionActions,
}

impl Harness {
    /// Every operation delivered with `strategy`.
    pub fn uniform(strategy: DeliveryStrategy) -> Self {
        Self::with_strategies(strategy, strategy, strategy)
    }

    pub fn with_strategies(
        on_insert: DeliveryStrategy,
        on_update: DeliveryStrategy,
        on_delete: DeliveryStrategy,
    ) -> Self {
        Self::build(
            CollectionConfig::new(COLLECTION)
                .with_insert(on_insert)
                .with_update(on_update)
                .with_delete(on_delete),
            Vec::new(),
        )
    }

    /// Build from `config`, with `records` already on the server.
    pub fn build(config: CollectionConfig, records: Vec<Fields>) -> Self {
        let api = Rc::new(RecordingApi::with_records(records));
        let wrapper = match create_collection(config, api.clone()) {
            Ok(wrapper) => wrapper,
            Err(e) => panic!("invalid harness config: {e}"),
        };
        let outbox = MemoryOutbox::new(wrapper.config().retry);
        outbox.register_collection(&wrapper);
        let actions = wrapper.actions(Rc::new(outbox.clone()));
        Self {
            api,
            wrapper,
            outbox,
            actions,
        }
    }

    pub fn collection(&self) -> &MemoryCollection {
        self.wrapper.collection()
    }
}
