//! Ferry Core Types
//!
//! This crate provides the foundational types used throughout the Ferry system:
//! - Entity values (the Value enum and the Fields record map)
//! - Identity types (Key, GlobalKey, MutationId, TransactionId)
//! - Key extraction from server records
//! - Common error types

mod error;
mod id;
mod value;

pub use error::*;
pub use id::*;
pub use value::*;
