//! In-memory local store.
//!
//! Keeps two layers: the synced records, only changed through write batches,
//! and an overlay holding local changes not yet written back. Readers see the
//! overlay on top of the synced layer.
//!
//! Each overlay entry belongs to the mutation that created it, so releasing
//! one mutation never hides another still pending on the same key.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use ferry_core::{now, Fields, GlobalKey, Key, KeyExtractor, MutationId, TransactionId};
use ferry_mutation::PendingMutation;
use ferry_sync::{LocalWriter, Persister, SyncError, SyncResult, WriteBatch, WriteOp};
use ferry_transaction::Transaction;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ActionError, ActionResult};
use crate::runtime::{LocalCollection, MutationHandle, MutationOptions};

/// In-memory collection; clones share the same records.
///
/// With a persister set, online and optimistic mutations start their round
/// trip on `tokio::task::spawn_local` as soon as they are recorded, so they
/// must be issued from within a `tokio::task::LocalSet`.
#[derive(Clone)]
pub struct MemoryCollection {
    inner: Rc<Inner>,
}

/// A local change shown ahead of the synced record.
#[derive(Debug, Clone)]
struct Layer {
    mutation_id: MutationId,
    /// Part of an offline transaction the runtime replays.
    queued: bool,
    /// `None` marks a local delete.
    record: Option<Fields>,
}

struct Inner {
    name: String,
    key_extractor: KeyExtractor,
    synced: RefCell<BTreeMap<Key, Fields>>,
    /// Oldest first; the last layer is the visible one.
    overlay: RefCell<BTreeMap<Key, Vec<Layer>>>,
    persister: RefCell<Option<Rc<Persister>>>,
    next_mutation_id: Cell<u64>,
    next_transaction_id: Cell<u64>,
    batches: Cell<usize>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, key_extractor: KeyExtractor) -> Self {
        Self {
            inner: Rc::new(Inner {
                name: name.into(),
                key_extractor,
                synced: RefCell::new(BTreeMap::new()),
                overlay: RefCell::new(BTreeMap::new()),
                persister: RefCell::new(None),
                next_mutation_id: Cell::new(1),
                next_transaction_id: Cell::new(1),
                batches: Cell::new(0),
            }),
        }
    }

    /// Persist online and optimistic mutations through `persister`. Without
    /// one, mutations settle locally.
    pub fn set_persister(&self, persister: Rc<Persister>) {
        *self.inner.persister.borrow_mut() = Some(persister);
    }

    /// Record as readers see it.
    pub fn get(&self, key: &Key) -> Option<Fields> {
        if let Some(layer) = self.inner.overlay.borrow().get(key).and_then(|l| l.last()) {
            return layer.record.clone();
        }
        self.inner.synced.borrow().get(key).cloned()
    }

    /// Record as last written back.
    pub fn get_synced(&self, key: &Key) -> Option<Fields> {
        self.inner.synced.borrow().get(key).cloned()
    }

    /// Visible records, ordered by key.
    pub fn values(&self) -> Vec<Fields> {
        let mut view = self.inner.synced.borrow().clone();
        for (key, layers) in self.inner.overlay.borrow().iter() {
            match layers.last().map(|layer| &layer.record) {
                Some(Some(record)) => view.insert(key.clone(), record.clone()),
                Some(None) => view.remove(key),
                None => None,
            };
        }
        view.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with local changes awaiting write-back.
    pub fn pending_keys(&self) -> Vec<Key> {
        self.inner.overlay.borrow().keys().cloned().collect()
    }

    /// Write batches applied so far; each one is a single notification to
    /// subscribers.
    pub fn batch_count(&self) -> usize {
        self.inner.batches.get()
    }

    /// Upsert `records` in one batch.
    pub fn load(&self, records: Vec<Fields>) -> SyncResult<()> {
        let mut batch = WriteBatch::new();
        for record in records {
            batch.upsert(record);
        }
        self.write_batch(batch)
    }

    fn global_key(&self, key: &Key) -> GlobalKey {
        GlobalKey::new(&self.inner.name, key)
    }

    fn next_mutation_id(&self) -> MutationId {
        let id = self.inner.next_mutation_id.get();
        self.inner.next_mutation_id.set(id + 1);
        MutationId::new(id)
    }

    fn next_transaction_id(&self) -> TransactionId {
        let id = self.inner.next_transaction_id.get();
        self.inner.next_transaction_id.set(id + 1);
        TransactionId::new(id)
    }

    fn push_layer(&self, mutation: &PendingMutation, queued: bool) {
        let record = if mutation.modified.is_empty() {
            None
        } else {
            Some(mutation.modified.clone())
        };
        self.inner
            .overlay
            .borrow_mut()
            .entry(mutation.key.clone())
            .or_default()
            .push(Layer {
                mutation_id: mutation.mutation_id,
                queued,
                record,
            });
    }

    /// Write mutations straight into the synced layer.
    fn settle_locally(&self, mutations: &[PendingMutation]) -> SyncResult<()> {
        let mut batch = WriteBatch::new();
        for mutation in mutations {
            if mutation.modified.is_empty() {
                batch.delete(mutation.key.clone());
            } else {
                batch.upsert(mutation.modified.clone());
            }
        }
        self.write_batch(batch)
    }

    fn begin(&self, mutation: PendingMutation, options: MutationOptions) -> ActionResult<MutationHandle> {
        let mutation = match options.metadata {
            Some(metadata) => mutation.with_metadata(metadata),
            None => mutation,
        }
        .stamped(self.next_mutation_id(), now());
        let transaction_id = self.next_transaction_id();
        let mutations = vec![mutation];

        if options.queued {
            self.push_layer(&mutations[0], true);
            return Ok(MutationHandle::settled(transaction_id, mutations));
        }

        let persister = self.inner.persister.borrow().clone();
        let Some(persister) = persister else {
            debug!(collection = %self.inner.name, "no persister, settling locally");
            self.settle_locally(&mutations)?;
            return Ok(MutationHandle::settled(transaction_id, mutations));
        };

        if options.optimistic {
            self.push_layer(&mutations[0], false);
        }

        let (done, signal) = oneshot::channel();
        let collection = self.clone();
        let transaction = Transaction::with_mutations(transaction_id, now(), mutations.clone());
        tokio::task::spawn_local(async move {
            let idempotency_key = transaction.idempotency_key();
            let result = persister
                .persist(&transaction, &idempotency_key, &collection)
                .await;
            // Written back or rolled back, the optimistic layer is done.
            collection.release(transaction.mutations());
            if let Err(e) = &result {
                warn!(
                    collection = %collection.inner.name,
                    transaction = %transaction.id,
                    error = %e,
                    "persist failed, local change rolled back"
                );
            }
            // The handle may have been dropped; the outcome is logged above.
            let _ = done.send(result.map(|_| ()).map_err(ActionError::from));
        });

        Ok(MutationHandle::new(transaction_id, mutations, signal))
    }
}

impl LocalCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn insert(&self, data: Fields, options: MutationOptions) -> ActionResult<MutationHandle> {
        let key = self.inner.key_extractor.extract(&data)?;
        if self.get(&key).is_some() {
            return Err(ActionError::duplicate_key(self.inner.name.clone(), key));
        }
        let mutation = PendingMutation::insert(self.global_key(&key), data);
        self.begin(mutation, options)
    }

    fn update(
        &self,
        key: &Key,
        options: MutationOptions,
        mutator: &mut dyn FnMut(&mut Fields),
    ) -> ActionResult<MutationHandle> {
        let original = self
            .get(key)
            .ok_or_else(|| ActionError::not_found(self.inner.name.clone(), key.clone()))?;
        let mut draft = original.clone();
        mutator(&mut draft);
        let mutation = PendingMutation::update(self.global_key(key), original, draft);
        self.begin(mutation, options)
    }

    fn delete(&self, key: &Key, options: MutationOptions) -> ActionResult<MutationHandle> {
        let original = self
            .get(key)
            .ok_or_else(|| ActionError::not_found(self.inner.name.clone(), key.clone()))?;
        let mutation = PendingMutation::delete(self.global_key(key), original);
        self.begin(mutation, options)
    }
}

impl LocalWriter for MemoryCollection {
    fn write_batch(&self, batch: WriteBatch) -> SyncResult<()> {
        // Resolve every key first so a bad record leaves the store untouched.
        let mut resolved = Vec::with_capacity(batch.len());
        for op in batch.into_ops() {
            match op {
                WriteOp::Upsert(record) => {
                    let key = self
                        .inner
                        .key_extractor
                        .extract(&record)
                        .map_err(|e| SyncError::store(e.to_string()))?;
                    resolved.push((key, Some(record)));
                }
                WriteOp::Delete(key) => resolved.push((key, None)),
            }
        }

        let mut synced = self.inner.synced.borrow_mut();
        for (key, record) in resolved.iter() {
            match record {
                Some(record) => synced.insert(key.clone(), record.clone()),
                None => synced.remove(key),
            };
        }
        self.inner.batches.set(self.inner.batches.get() + 1);

        debug!(collection = %self.inner.name, ops = resolved.len(), "write batch applied");
        Ok(())
    }

    /// A queued mutation stands for every queued change to its key up to it,
    /// since consolidation folds them into the latest one. Any other mutation
    /// releases only its own layer.
    fn release(&self, mutations: &[PendingMutation]) {
        let mut overlay = self.inner.overlay.borrow_mut();
        for mutation in mutations {
            let Some(layers) = overlay.get_mut(&mutation.key) else {
                continue;
            };
            let owner = layers
                .iter()
                .find(|layer| layer.mutation_id == mutation.mutation_id)
                .map(|layer| layer.queued);
            match owner {
                Some(true) => layers
                    .retain(|layer| !(layer.queued && layer.mutation_id <= mutation.mutation_id)),
                Some(false) => layers.retain(|layer| layer.mutation_id != mutation.mutation_id),
                None => {}
            }
            if layers.is_empty() {
                overlay.remove(&mutation.key);
            }
        }
    }
}
