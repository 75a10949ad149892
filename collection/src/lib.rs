//! Ferry Collection
//!
//! User-facing side of an offline-capable collection.
//!
//! Responsibilities:
//! - Collection configuration and validation against the remote API
//! - Actions delivering each operation online, optimistically or offline
//! - The in-memory local store with its optimistic overlay
//! - Interfaces to the offline runtime
//!
//! # Module Structure
//!
//! - `config`: collection configuration and retry policy
//! - `runtime`: local store and offline runtime traits, mutation handles
//! - `strategy`: the delivery strategy dispatch
//! - `actions`: `add_one`, `update_one`, `delete_one`
//! - `memory`: in-memory local store
//! - `wrapper`: collection assembly and initial load
//! - `error`: action and configuration errors

mod actions;
mod config;
mod error;
mod memory;
mod runtime;
mod strategy;
mod wrapper;

pub use actions::{build_actions, CollectionActions};
pub use config::{CollectionConfig, RetryPolicy};
pub use error::{ActionError, ActionResult, ConfigError, ConfigResult};
pub use ferry_mutation::DeliveryStrategy;
pub use memory::MemoryCollection;
pub use runtime::{
    LeadershipListener, LocalCollection, MutationHandle, MutationOptions, OfflineRuntime,
    OfflineTransaction, OfflineTransactionOptions, PersistSignal,
};
pub use strategy::{Dispatched, OperationKind};
pub use wrapper::{create_collection, OfflineCollection};
