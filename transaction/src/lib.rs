//! Ferry Transaction
//!
//! Queued transactions and backlog consolidation.
//!
//! Responsibilities:
//! - Group pending mutations created together (`Transaction`)
//! - Keep the derived list of touched global keys current
//! - Collapse a backlog of transactions into its minimal net effect
//!   (`consolidate`), merging same-entity mutations across transactions

mod consolidate;
mod error;
mod transaction;

pub use consolidate::consolidate;
pub use error::{TransactionError, TransactionResult};
pub use transaction::Transaction;
