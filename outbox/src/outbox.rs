//! In-memory offline runtime.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use ferry_collection::{
    ActionError, ActionResult, LeadershipListener, MutationHandle, OfflineCollection,
    OfflineRuntime, OfflineTransaction, OfflineTransactionOptions, RetryPolicy,
};
use ferry_core::{now, GlobalKey, Timestamp, TransactionId};
use ferry_mutation::PendingMutation;
use ferry_sync::{LocalWriter, Persister};
use ferry_transaction::{consolidate, Transaction};
use tracing::{debug, info, warn};

use crate::entry::{QueuedTransaction, ReplayStats};
use crate::error::{OutboxError, OutboxResult};

/// A registered sync function: the persister and the store it writes into.
#[derive(Clone)]
struct SyncFn {
    persister: Rc<Persister>,
    store: Rc<dyn LocalWriter>,
}

struct Inner {
    backlog: RefCell<Vec<QueuedTransaction>>,
    sync_fns: RefCell<HashMap<String, SyncFn>>,
    listeners: RefCell<Vec<Rc<dyn LeadershipListener>>>,
    is_leader: Cell<bool>,
    retry: RetryPolicy,
    next_txn_id: Cell<u64>,
    last_created_at: Cell<Timestamp>,
}

impl Inner {
    fn alloc_txn_id(&self) -> TransactionId {
        let id = self.next_txn_id.get();
        self.next_txn_id.set(id + 1);
        TransactionId::new(id)
    }

    /// Wall-clock time, forced strictly increasing so creation order survives
    /// the consolidator's sort.
    fn next_created_at(&self) -> Timestamp {
        let created_at = now().max(self.last_created_at.get() + 1);
        self.last_created_at.set(created_at);
        created_at
    }

    fn enqueue(&self, entry: QueuedTransaction) {
        debug!(
            transaction = %entry.id(),
            sync_fn = %entry.mutation_fn_name,
            mutations = entry.transaction.len(),
            "transaction queued"
        );
        self.backlog.borrow_mut().push(entry);
    }

    /// Put unfinished entries back ahead of anything queued meanwhile.
    fn restore(&self, mut entries: Vec<QueuedTransaction>) -> usize {
        let mut backlog = self.backlog.borrow_mut();
        entries.append(&mut backlog);
        *backlog = entries;
        backlog.len()
    }
}

/// In-memory offline runtime owning the backlog of queued transactions.
///
/// Only the leader replays. Transactions are consolidated per sync function,
/// then replayed one at a time in creation order; the first failure stops the
/// pass.
#[derive(Clone)]
pub struct MemoryOutbox {
    inner: Rc<Inner>,
}

impl Default for MemoryOutbox {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl MemoryOutbox {
    /// Create an outbox that leads from the start.
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            inner: Rc::new(Inner {
                backlog: RefCell::new(Vec::new()),
                sync_fns: RefCell::new(HashMap::new()),
                listeners: RefCell::new(Vec::new()),
                is_leader: Cell::new(true),
                retry,
                next_txn_id: Cell::new(1),
                last_created_at: Cell::new(0),
            }),
        }
    }

    /// Register the sync function queued transactions name.
    pub fn register_sync_fn(
        &self,
        name: impl Into<String>,
        persister: Rc<Persister>,
        store: Rc<dyn LocalWriter>,
    ) {
        let name = name.into();
        debug!(sync_fn = %name, "sync function registered");
        self.inner
            .sync_fns
            .borrow_mut()
            .insert(name, SyncFn { persister, store });
    }

    /// Register a collection's persister under its sync function name.
    pub fn register_collection(&self, collection: &OfflineCollection) {
        self.register_sync_fn(
            collection.mutation_fn_name(),
            collection.persister(),
            collection.writer(),
        );
    }

    pub fn add_leadership_listener(&self, listener: Rc<dyn LeadershipListener>) {
        self.inner.listeners.borrow_mut().push(listener);
    }

    pub fn is_leader(&self) -> bool {
        self.inner.is_leader.get()
    }

    /// Record a leadership change and notify the listeners.
    pub fn set_leader(&self, is_leader: bool) {
        if self.inner.is_leader.replace(is_leader) == is_leader {
            return;
        }
        if is_leader {
            info!("this context is now the leader");
        } else {
            warn!("leadership lost, running in online-only mode");
        }

        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener.on_leadership_change(is_leader);
        }
    }

    /// Snapshot of the backlog.
    pub fn backlog(&self) -> Vec<QueuedTransaction> {
        self.inner.backlog.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.backlog.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.backlog.borrow().is_empty()
    }

    /// Consolidate the backlog and replay it in creation order.
    pub async fn replay(&self) -> OutboxResult<ReplayStats> {
        if !self.is_leader() {
            return Err(OutboxError::NotLeader);
        }

        let entries = std::mem::take(&mut *self.inner.backlog.borrow_mut());
        let mut stats = ReplayStats {
            queued: entries.len(),
            ..ReplayStats::default()
        };
        if entries.is_empty() {
            return Ok(stats);
        }

        let consolidated = match consolidate_backlog(&entries) {
            Ok(consolidated) => consolidated,
            Err(e) => {
                self.inner.restore(entries);
                return Err(e);
            }
        };
        // Changes that cancelled out have nothing left to show locally.
        for (name, mutations) in &consolidated.cancelled {
            let sync_fn = self.inner.sync_fns.borrow().get(name).cloned();
            if let Some(sync_fn) = sync_fn {
                sync_fn.store.release(mutations);
            }
        }
        let mut pending = VecDeque::from(consolidated.transactions);
        stats.consolidated = pending.len();

        while let Some(mut entry) = pending.pop_front() {
            let sync_fn = self.inner.sync_fns.borrow().get(&entry.mutation_fn_name).cloned();
            let Some(sync_fn) = sync_fn else {
                let name = entry.mutation_fn_name.clone();
                pending.push_front(entry);
                self.inner.restore(pending.into());
                return Err(OutboxError::unknown_sync_fn(name));
            };

            let idempotency_key = entry.transaction.idempotency_key();
            let result = sync_fn
                .persister
                .persist(&entry.transaction, &idempotency_key, sync_fn.store.as_ref())
                .await;

            match result {
                Ok(_) => stats.replayed += 1,
                Err(e) if e.is_retryable() => {
                    entry.attempts += 1;
                    if self.inner.retry.allows_retry(entry.attempts) {
                        let delay = self.inner.retry.delay_for(entry.attempts - 1);
                        warn!(
                            transaction = %entry.id(),
                            attempts = entry.attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %e,
                            "replay failed, transaction stays queued"
                        );
                        entry.retry_delay = Some(delay);
                        stats.failed = Some(entry.id());
                        pending.push_front(entry);
                    } else {
                        warn!(
                            transaction = %entry.id(),
                            attempts = entry.attempts,
                            error = %e,
                            "retries exhausted, transaction abandoned"
                        );
                        sync_fn.store.release(entry.transaction.mutations());
                        stats.abandoned = Some(entry.id());
                    }
                    break;
                }
                Err(e) => {
                    let id = entry.id();
                    warn!(transaction = %id, error = %e, "replay rejected, transaction dropped");
                    sync_fn.store.release(entry.transaction.mutations());
                    self.inner.restore(pending.into());
                    return Err(OutboxError::rejected(id, e));
                }
            }
        }

        stats.remaining = self.inner.restore(pending.into());
        info!(
            queued = stats.queued,
            consolidated = stats.consolidated,
            replayed = stats.replayed,
            remaining = stats.remaining,
            "replay pass finished"
        );
        Ok(stats)
    }

    /// Replay until the backlog is empty, sleeping out the retry delay after
    /// each transient failure. Returns the number of transactions replayed.
    pub async fn drain(&self) -> OutboxResult<usize> {
        let mut replayed = 0;
        while !self.is_empty() {
            let stats = self.replay().await?;
            replayed += stats.replayed;

            if stats.failed.is_some() {
                let delay = self
                    .inner
                    .backlog
                    .borrow()
                    .first()
                    .and_then(|entry| entry.retry_delay);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Ok(replayed)
    }
}

/// Backlog after consolidation.
struct Consolidated {
    /// Survivors in creation order.
    transactions: Vec<QueuedTransaction>,
    /// Mutations that cancelled out, per sync function.
    cancelled: Vec<(String, Vec<PendingMutation>)>,
}

/// Consolidate each sync function's transactions separately, then order the
/// survivors by creation time.
fn consolidate_backlog(entries: &[QueuedTransaction]) -> OutboxResult<Consolidated> {
    let mut bookkeeping: HashMap<TransactionId, (String, u32, Option<std::time::Duration>)> =
        HashMap::new();
    let mut groups: Vec<(String, Vec<Transaction>)> = Vec::new();

    for entry in entries {
        bookkeeping.insert(
            entry.id(),
            (entry.mutation_fn_name.clone(), entry.attempts, entry.retry_delay),
        );
        match groups.iter_mut().find(|(name, _)| *name == entry.mutation_fn_name) {
            Some((_, transactions)) => transactions.push(entry.transaction.clone()),
            None => groups.push((entry.mutation_fn_name.clone(), vec![entry.transaction.clone()])),
        }
    }

    let mut survivors = Vec::new();
    let mut cancelled = Vec::new();
    for (name, transactions) in groups {
        let originals: Vec<PendingMutation> = transactions
            .iter()
            .flat_map(|tx| tx.mutations().iter().cloned())
            .collect();
        let merged = consolidate(transactions)?;

        let kept: HashSet<&GlobalKey> = merged.iter().flat_map(|tx| tx.keys()).collect();
        let gone: Vec<PendingMutation> = originals
            .into_iter()
            .filter(|m| !kept.contains(&m.global_key))
            .collect();
        if !gone.is_empty() {
            cancelled.push((name, gone));
        }
        survivors.extend(merged);
    }
    survivors.sort_by_key(|tx| tx.created_at);

    let transactions = survivors
        .into_iter()
        .filter_map(|transaction| {
            let (name, attempts, retry_delay) = bookkeeping.remove(&transaction.id)?;
            Some(QueuedTransaction {
                transaction,
                mutation_fn_name: name,
                attempts,
                retry_delay,
            })
        })
        .collect();

    Ok(Consolidated {
        transactions,
        cancelled,
    })
}

impl OfflineRuntime for MemoryOutbox {
    fn create_offline_transaction(
        &self,
        options: OfflineTransactionOptions,
    ) -> Rc<dyn OfflineTransaction> {
        Rc::new(OutboxTransaction {
            outbox: self.inner.clone(),
            id: self.inner.alloc_txn_id(),
            created_at: self.inner.next_created_at(),
            options,
            mutations: RefCell::new(Vec::new()),
            committed: Cell::new(false),
        })
    }
}

/// Offline transaction under construction.
struct OutboxTransaction {
    outbox: Rc<Inner>,
    id: TransactionId,
    created_at: Timestamp,
    options: OfflineTransactionOptions,
    mutations: RefCell<Vec<PendingMutation>>,
    committed: Cell<bool>,
}

impl OfflineTransaction for OutboxTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn mutation_fn_name(&self) -> &str {
        &self.options.mutation_fn_name
    }

    fn mutate<'a>(
        &self,
        f: Box<dyn FnOnce() -> ActionResult<MutationHandle> + 'a>,
    ) -> ActionResult<()> {
        if self.committed.get() {
            return Err(ActionError::TransactionClosed { id: self.id });
        }
        let handle = f()?;
        self.mutations
            .borrow_mut()
            .extend(handle.mutations().iter().cloned());

        if self.options.auto_commit {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&self) -> ActionResult<()> {
        if self.committed.replace(true) {
            return Err(ActionError::TransactionClosed { id: self.id });
        }

        let mutations = self.mutations.borrow().clone();
        if mutations.is_empty() {
            debug!(transaction = %self.id, "empty transaction not queued");
            return Ok(());
        }

        let transaction = Transaction::with_mutations(self.id, self.created_at, mutations);
        self.outbox.enqueue(QueuedTransaction::new(
            transaction,
            self.options.mutation_fn_name.clone(),
        ));
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.committed.get()
    }

    fn mutations(&self) -> Vec<PendingMutation> {
        self.mutations.borrow().clone()
    }
}
