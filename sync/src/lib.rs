//! Ferry Sync
//!
//! Replays pending transactions against a remote API and folds the server's
//! answers back into the local store.
//!
//! Responsibilities:
//! - Dispatch each mutation to the endpoint registered for its type
//! - Replay a transaction sequentially under one idempotency key
//! - Validate responses and write them back in a single batch
//!
//! # Module Structure
//!
//! - `endpoints`: remote endpoint trait, request bodies, dispatch table
//! - `pipeline`: sequential execution of one transaction
//! - `store`: write batches and the local store's write side
//! - `write_back`: response validation and batched write-back
//! - `persister`: execution followed by write-back
//! - `error`: sync error taxonomy

mod endpoints;
mod error;
mod persister;
mod pipeline;
mod store;
mod write_back;

pub use endpoints::{
    AddOneRequest, DeleteOneRequest, MutationsMap, RemoteEndpoints, RemoteResponse,
    UpdateOneRequest,
};
pub use error::{RemoteError, SyncError, SyncResult};
pub use persister::Persister;
pub use pipeline::{execute, MutationResponse};
pub use store::{LocalWriter, WriteBatch, WriteOp};
pub use write_back::ApplyWrite;
