//! Demo error types.

use ferry_collection::{ActionError, ConfigError};
use ferry_outbox::OutboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("action error: {0}")]
    Action(#[from] ActionError),

    #[error("outbox error: {0}")]
    Outbox(#[from] OutboxError),
}

pub type DemoResult<T> = Result<T, DemoError>;
