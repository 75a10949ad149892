//! Remote endpoints and the per-type dispatch table.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use ferry_core::{Fields, Key};
use ferry_mutation::{MutationType, PendingMutation};
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, SyncError, SyncResult};

/// Body every endpoint answers with: the affected records, never empty on
/// success (deletes echo the deleted key back).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub data: Vec<Fields>,
}

impl RemoteResponse {
    pub fn new(data: Vec<Fields>) -> Self {
        Self { data }
    }

    pub fn single(record: Fields) -> Self {
        Self { data: vec![record] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOneRequest {
    pub data: Fields,
    pub metadata: Fields,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOneRequest {
    pub key: Key,
    pub changes: Fields,
    pub metadata: Fields,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOneRequest {
    pub key: Key,
    pub metadata: Fields,
    pub idempotency_key: String,
}

/// The remote API of one entity collection.
#[async_trait(?Send)]
pub trait RemoteEndpoints {
    async fn add_one(&self, request: AddOneRequest) -> Result<RemoteResponse, RemoteError>;

    async fn update_one(&self, request: UpdateOneRequest) -> Result<RemoteResponse, RemoteError>;

    async fn delete_one(&self, request: DeleteOneRequest) -> Result<RemoteResponse, RemoteError>;

    /// Full snapshot, read once when the collection is initialized.
    async fn find_many(&self) -> Result<RemoteResponse, RemoteError>;

    /// Whether the API exposes the endpoint for `mutation_type`.
    fn provides(&self, _mutation_type: MutationType) -> bool {
        true
    }
}

/// Dispatch table from mutation type to endpoint call.
#[derive(Clone)]
pub struct MutationsMap {
    endpoints: Rc<dyn RemoteEndpoints>,
    registered: BTreeSet<MutationType>,
}

impl MutationsMap {
    /// Register the given types.
    pub fn new(
        endpoints: Rc<dyn RemoteEndpoints>,
        types: impl IntoIterator<Item = MutationType>,
    ) -> Self {
        Self {
            endpoints,
            registered: types.into_iter().collect(),
        }
    }

    /// Register every type the endpoints provide.
    pub fn from_endpoints(endpoints: Rc<dyn RemoteEndpoints>) -> Self {
        let types: Vec<_> = [MutationType::Insert, MutationType::Update, MutationType::Delete]
            .into_iter()
            .filter(|t| endpoints.provides(*t))
            .collect();
        Self::new(endpoints, types)
    }

    pub fn is_registered(&self, mutation_type: MutationType) -> bool {
        self.registered.contains(&mutation_type)
    }

    /// Call the endpoint registered for the mutation's type.
    pub async fn dispatch(
        &self,
        mutation: &PendingMutation,
        idempotency_key: &str,
    ) -> SyncResult<RemoteResponse> {
        if !self.is_registered(mutation.mutation_type) {
            return Err(SyncError::missing_endpoint(mutation.mutation_type));
        }

        let metadata = mutation.remote_metadata();
        let idempotency_key = idempotency_key.to_string();
        let result = match mutation.mutation_type {
            MutationType::Insert => {
                self.endpoints
                    .add_one(AddOneRequest {
                        data: mutation.modified.clone(),
                        metadata,
                        idempotency_key,
                    })
                    .await
            }
            MutationType::Update => {
                self.endpoints
                    .update_one(UpdateOneRequest {
                        key: mutation.key.clone(),
                        changes: mutation.changes.clone(),
                        metadata,
                        idempotency_key,
                    })
                    .await
            }
            MutationType::Delete => {
                self.endpoints
                    .delete_one(DeleteOneRequest {
                        key: mutation.key.clone(),
                        metadata,
                        idempotency_key,
                    })
                    .await
            }
        };

        result.map_err(|e| SyncError::remote(mutation.mutation_type, mutation.key.clone(), e))
    }
}

impl fmt::Debug for MutationsMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationsMap")
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}
