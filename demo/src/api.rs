//! In-memory todo API.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::{fields, Fields, Key};
use ferry_sync::{
    AddOneRequest, DeleteOneRequest, RemoteEndpoints, RemoteError, RemoteResponse,
    UpdateOneRequest,
};
use tracing::info;

const LATENCY: Duration = Duration::from_millis(300);

/// Todo backend with simulated latency and a network switch.
#[derive(Debug, Default)]
pub struct TodoApi {
    todos: RefCell<BTreeMap<Key, Fields>>,
    deleted: RefCell<BTreeSet<Key>>,
    offline: Cell<bool>,
    seen_idempotency_keys: RefCell<Vec<String>>,
}

impl TodoApi {
    pub fn with_todos(todos: impl IntoIterator<Item = Fields>) -> Self {
        let api = Self::default();
        for todo in todos {
            if let Some(key) = todo.get("id").and_then(Key::from_value) {
                api.todos.borrow_mut().insert(key, todo);
            }
        }
        api
    }

    /// Simulate losing (or regaining) the network.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn todos(&self) -> Vec<Fields> {
        self.todos.borrow().values().cloned().collect()
    }

    /// Idempotency keys in call order.
    pub fn idempotency_keys(&self) -> Vec<String> {
        self.seen_idempotency_keys.borrow().clone()
    }

    async fn round_trip(&self, idempotency_key: Option<&str>) -> Result<(), RemoteError> {
        tokio::time::sleep(LATENCY).await;
        if self.offline.get() {
            return Err(RemoteError::new("network unreachable"));
        }
        if let Some(key) = idempotency_key {
            self.seen_idempotency_keys.borrow_mut().push(key.to_string());
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl RemoteEndpoints for TodoApi {
    async fn add_one(&self, request: AddOneRequest) -> Result<RemoteResponse, RemoteError> {
        self.round_trip(Some(&request.idempotency_key)).await?;
        let key = request
            .data
            .get("id")
            .and_then(Key::from_value)
            .ok_or_else(|| RemoteError::new("todo without id"))?;
        self.todos.borrow_mut().insert(key, request.data.clone());
        info!(todo = ?request.data, "addOne");
        Ok(RemoteResponse::single(request.data))
    }

    async fn update_one(&self, request: UpdateOneRequest) -> Result<RemoteResponse, RemoteError> {
        self.round_trip(Some(&request.idempotency_key)).await?;
        let mut todos = self.todos.borrow_mut();
        let todo = todos
            .get_mut(&request.key)
            .ok_or_else(|| RemoteError::new(format!("todo {} not found", request.key)))?;
        todo.extend(request.changes);
        info!(todo = ?todo, "updateOne");
        Ok(RemoteResponse::single(todo.clone()))
    }

    /// Deletes answer with the deleted key only.
    async fn delete_one(&self, request: DeleteOneRequest) -> Result<RemoteResponse, RemoteError> {
        self.round_trip(Some(&request.idempotency_key)).await?;
        if self.deleted.borrow().contains(&request.key) {
            return Err(RemoteError::new("Not Found (404)"));
        }
        self.todos.borrow_mut().remove(&request.key);
        self.deleted.borrow_mut().insert(request.key.clone());
        info!(key = %request.key, metadata = ?request.metadata, "deleteOne");
        Ok(RemoteResponse::single(fields! { "id" => request.key.as_str() }))
    }

    async fn find_many(&self) -> Result<RemoteResponse, RemoteError> {
        self.round_trip(None).await?;
        Ok(RemoteResponse::new(self.todos()))
    }
}
