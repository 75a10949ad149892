//! Identity types for Ferry entities, mutations and transactions.
//!
//! - `Key` is the local entity identifier, stable within one collection.
//! - `GlobalKey` qualifies a key with its collection name and is what pending
//!   mutations are grouped by.
//! - `MutationId` and `TransactionId` are opaque, monotonically assigned ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{CoreError, CoreResult, Fields, Value};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current wall-clock time. A clock set before the epoch reads as 0.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

const GLOBAL_KEY_PREFIX: &str = "KEY::";

/// Local identifier of an entity within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub String);

impl Key {
    /// Create a key from anything string-like.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a key from a field value. Only strings and integers identify entities.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Int(i) => Some(Self(i.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<i64> for Key {
    fn from(key: i64) -> Self {
        Self(key.to_string())
    }
}

/// Collection-qualified entity identifier, rendered `KEY::<collection>/<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalKey(String);

impl GlobalKey {
    /// Build the global key for `key` in `collection`.
    pub fn new(collection: &str, key: &Key) -> Self {
        Self(format!("{GLOBAL_KEY_PREFIX}{collection}/{key}"))
    }

    /// Wrap an already-rendered global key.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The local key: everything after the last `/`.
    pub fn key(&self) -> Key {
        match self.0.rsplit_once('/') {
            Some((_, key)) => Key::new(key),
            None => Key::new(self.0.as_str()),
        }
    }

    /// The collection part, if the key is in the canonical format.
    pub fn collection(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(GLOBAL_KEY_PREFIX)?;
        rest.rsplit_once('/').map(|(collection, _)| collection)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one pending mutation; latest wins on merge.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MutationId(pub u64);

impl MutationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Identifier of a queued transaction. Its string form doubles as the
/// idempotency key sent to remote endpoints when the transaction replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Extracts the entity key from a server record (the collection's `getKey`).
#[derive(Clone)]
pub struct KeyExtractor {
    field: Option<String>,
    extract: Arc<dyn Fn(&Fields) -> Option<Key> + Send + Sync>,
}

impl KeyExtractor {
    /// Read the key from a named field.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        let lookup = name.clone();
        Self {
            field: Some(name),
            extract: Arc::new(move |record: &Fields| record.get(&lookup).and_then(Key::from_value)),
        }
    }

    /// Use a custom extraction function.
    pub fn custom(extract: impl Fn(&Fields) -> Option<Key> + Send + Sync + 'static) -> Self {
        Self {
            field: None,
            extract: Arc::new(extract),
        }
    }

    /// Extract the key of `record`.
    pub fn extract(&self, record: &Fields) -> CoreResult<Key> {
        match (self.extract)(record) {
            Some(key) => Ok(key),
            None => match &self.field {
                Some(field) => Err(CoreError::missing_key(field.clone())),
                None => Err(CoreError::KeyNotExtracted),
            },
        }
    }
}

impl Default for KeyExtractor {
    fn default() -> Self {
        Self::field("id")
    }
}

impl fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExtractor")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}
