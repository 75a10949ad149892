//! Offline-capable collection assembly.

use std::rc::Rc;

use ferry_sync::{ApplyWrite, LocalWriter, MutationsMap, Persister, RemoteEndpoints, WriteBatch};
use tracing::info;

use crate::actions::{build_actions, CollectionActions};
use crate::config::CollectionConfig;
use crate::error::{ActionError, ActionResult, ConfigError, ConfigResult};
use crate::memory::MemoryCollection;
use crate::runtime::OfflineRuntime;

/// A local collection wired to its remote API.
pub struct OfflineCollection {
    config: CollectionConfig,
    collection: MemoryCollection,
    endpoints: Rc<dyn RemoteEndpoints>,
    persister: Rc<Persister>,
}

/// Validate `config` against `endpoints` and assemble the collection.
///
/// Every operation with a configured strategy needs its endpoint. The
/// persister built here handles the collection's online and optimistic
/// mutations and is the sync function to register with the offline runtime.
pub fn create_collection(
    config: CollectionConfig,
    endpoints: Rc<dyn RemoteEndpoints>,
) -> ConfigResult<OfflineCollection> {
    config.validate()?;

    let required = config.required_endpoints();
    if let Some(missing) = required.iter().find(|t| !endpoints.provides(**t)) {
        return Err(ConfigError::missing_endpoint(config.name.clone(), *missing));
    }

    let mutations = MutationsMap::from_endpoints(endpoints.clone());
    let applier = ApplyWrite::new(config.key_extractor());
    let persister = Rc::new(Persister::new(mutations, applier));

    let collection = MemoryCollection::new(config.name.clone(), config.key_extractor());
    collection.set_persister(persister.clone());

    info!(
        collection = %config.name,
        sync_fn = %config.mutation_fn_name(),
        on_insert = ?config.on_insert,
        on_update = ?config.on_update,
        on_delete = ?config.on_delete,
        "collection created"
    );

    Ok(OfflineCollection {
        config,
        collection,
        endpoints,
        persister,
    })
}

impl OfflineCollection {
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn collection(&self) -> &MemoryCollection {
        &self.collection
    }

    pub fn persister(&self) -> Rc<Persister> {
        self.persister.clone()
    }

    /// The store handle the offline runtime writes replay results into.
    pub fn writer(&self) -> Rc<dyn LocalWriter> {
        Rc::new(self.collection.clone())
    }

    pub fn mutation_fn_name(&self) -> String {
        self.config.mutation_fn_name()
    }

    /// Load the server snapshot in one batch; returns the record count.
    pub async fn initialize(&self) -> ActionResult<usize> {
        let snapshot = self
            .endpoints
            .find_many()
            .await
            .map_err(|e| ActionError::initial_load(self.config.name.clone(), e))?;

        let count = snapshot.data.len();
        let mut batch = WriteBatch::new();
        for record in snapshot.data {
            batch.upsert(record);
        }
        self.collection.write_batch(batch)?;

        info!(collection = %self.config.name, records = count, "collection initialized");
        Ok(count)
    }

    /// Actions following the configured strategies.
    pub fn actions(&self, runtime: Rc<dyn OfflineRuntime>) -> CollectionActions {
        build_actions(&self.config, Rc::new(self.collection.clone()), runtime)
    }
}
