//! Interfaces of the local store and the offline runtime.
//!
//! The collection actions drive both through these traits: the local store
//! records pending mutations and exposes a persisted signal per mutation, the
//! offline runtime groups queued mutations into transactions it replays later.

use std::fmt;
use std::rc::Rc;

use ferry_core::{Fields, Key, TransactionId};
use ferry_mutation::{MutationMetadata, PendingMutation};

use tokio::sync::oneshot;

use crate::error::{ActionError, ActionResult};

/// Completion of a remote round trip already under way.
pub type PersistSignal = oneshot::Receiver<ActionResult<()>>;

/// How the local store should treat one mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOptions {
    /// Visible to readers before the remote round trip.
    pub optimistic: bool,
    /// Belongs to an offline transaction; the runtime replays it, the store
    /// keeps it visible until the write-back lands.
    pub queued: bool,
    pub metadata: Option<MutationMetadata>,
}

impl MutationOptions {
    pub fn online(metadata: MutationMetadata) -> Self {
        Self {
            optimistic: false,
            queued: false,
            metadata: Some(metadata),
        }
    }

    pub fn optimistic(metadata: MutationMetadata) -> Self {
        Self {
            optimistic: true,
            queued: false,
            metadata: Some(metadata),
        }
    }

    pub fn queued(metadata: MutationMetadata) -> Self {
        Self {
            optimistic: true,
            queued: true,
            metadata: Some(metadata),
        }
    }
}

/// In-flight mutation of the local store.
pub struct MutationHandle {
    transaction_id: TransactionId,
    mutations: Vec<PendingMutation>,
    persist: Option<PersistSignal>,
}

impl MutationHandle {
    pub fn new(
        transaction_id: TransactionId,
        mutations: Vec<PendingMutation>,
        persist: PersistSignal,
    ) -> Self {
        Self {
            transaction_id,
            mutations,
            persist: Some(persist),
        }
    }

    /// A mutation with nothing left to confirm.
    pub fn settled(transaction_id: TransactionId, mutations: Vec<PendingMutation>) -> Self {
        Self {
            transaction_id,
            mutations,
            persist: None,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn mutations(&self) -> &[PendingMutation] {
        &self.mutations
    }

    pub fn is_settled(&self) -> bool {
        self.persist.is_none()
    }

    /// Resolve once the mutation is confirmed remotely and written back.
    ///
    /// The round trip runs whether or not the handle is awaited; dropping the
    /// handle only discards the outcome.
    pub async fn persisted(self) -> ActionResult<Vec<PendingMutation>> {
        if let Some(persist) = self.persist {
            persist
                .await
                .map_err(|_| ActionError::persist_aborted(self.transaction_id))??;
        }
        Ok(self.mutations)
    }
}

impl fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHandle")
            .field("transaction_id", &self.transaction_id)
            .field("mutations", &self.mutations)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// The reactive local store the actions mutate.
pub trait LocalCollection {
    fn name(&self) -> &str;

    fn insert(&self, data: Fields, options: MutationOptions) -> ActionResult<MutationHandle>;

    /// Apply `mutator` to a draft of the current record.
    fn update(
        &self,
        key: &Key,
        options: MutationOptions,
        mutator: &mut dyn FnMut(&mut Fields),
    ) -> ActionResult<MutationHandle>;

    fn delete(&self, key: &Key, options: MutationOptions) -> ActionResult<MutationHandle>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineTransactionOptions {
    /// Sync function the runtime replays the transaction with.
    pub mutation_fn_name: String,
    /// Queue the transaction as soon as `mutate` returns.
    pub auto_commit: bool,
}

/// A transaction queued in the offline runtime.
pub trait OfflineTransaction {
    fn id(&self) -> TransactionId;

    fn mutation_fn_name(&self) -> &str;

    /// Run `f` and record the store mutations it returns in this transaction.
    fn mutate<'a>(
        &self,
        f: Box<dyn FnOnce() -> ActionResult<MutationHandle> + 'a>,
    ) -> ActionResult<()>;

    /// Hand the transaction to the runtime's backlog.
    fn commit(&self) -> ActionResult<()>;

    fn is_committed(&self) -> bool;

    fn mutations(&self) -> Vec<PendingMutation>;
}

/// Offline runtime owning the backlog of queued transactions.
pub trait OfflineRuntime {
    fn create_offline_transaction(
        &self,
        options: OfflineTransactionOptions,
    ) -> Rc<dyn OfflineTransaction>;
}

/// Notified when this context gains or loses ownership of the backlog.
pub trait LeadershipListener {
    fn on_leadership_change(&self, is_leader: bool);
}
