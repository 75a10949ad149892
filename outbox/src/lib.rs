//! Ferry Outbox
//!
//! In-memory offline runtime.
//!
//! Responsibilities:
//! - Group queued mutations into offline transactions
//! - Hold the backlog until the leader replays it
//! - Consolidate the backlog and replay it through registered sync functions
//! - Track failed attempts and the retry schedule
//!
//! # Module Structure
//!
//! - `entry`: backlog entries and replay statistics
//! - `outbox`: the runtime and its offline transactions
//! - `error`: outbox errors

mod entry;
mod error;
mod outbox;

pub use entry::{QueuedTransaction, ReplayStats};
pub use error::{OutboxError, OutboxResult};
pub use outbox::MemoryOutbox;
