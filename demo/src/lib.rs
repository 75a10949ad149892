//! Ferry Demo
//!
//! Todo list edited while offline, then synced.
//!
//! # Module Structure
//!
//! - `api`: in-memory todo backend
//! - `error`: demo errors

mod api;
mod error;

use std::rc::Rc;

use ferry_collection::{create_collection, CollectionConfig, LeadershipListener, OfflineRuntime};
use ferry_core::{fields, Fields, Key};
use ferry_outbox::MemoryOutbox;
use tracing::{info, warn};

pub use api::TodoApi;
pub use error::{DemoError, DemoResult};

const TODOS_CONFIG: &str = r#"{
    "name": "todos",
    "onInsert": "offline",
    "onUpdate": "offline",
    "onDelete": "offline"
}"#;

/// Logs leadership handoffs.
struct LeadershipLog;

impl LeadershipListener for LeadershipLog {
    fn on_leadership_change(&self, is_leader: bool) {
        if is_leader {
            info!("this tab is now the leader");
        } else {
            info!("running in online-only mode (another tab is the leader)");
        }
    }
}

/// What the scenario ended with.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Local records after the final sync.
    pub local: Vec<Fields>,
    /// Server records after the final sync.
    pub remote: Vec<Fields>,
    /// Transactions confirmed by the server.
    pub replayed: usize,
}

pub fn seed() -> Vec<Fields> {
    vec![
        fields! { "id" => "t1", "title" => "Learn Ferry", "completed" => false },
        fields! { "id" => "t2", "title" => "Build an app", "completed" => false },
    ]
}

/// Edit the todo list offline, fail one sync attempt, then sync for real.
pub async fn run() -> DemoResult<Summary> {
    let api = Rc::new(TodoApi::with_todos(seed()));
    let todos = create_collection(CollectionConfig::from_json(TODOS_CONFIG)?, api.clone())?;
    let loaded = todos.initialize().await?;
    info!(loaded, "todos loaded");

    let outbox = MemoryOutbox::new(todos.config().retry);
    outbox.add_leadership_listener(Rc::new(LeadershipLog));
    outbox.register_collection(&todos);
    let runtime: Rc<dyn OfflineRuntime> = Rc::new(outbox.clone());
    let actions = todos.actions(runtime);

    api.set_offline(true);
    warn!("network lost, edits are queued");

    actions
        .add_one(
            fields! { "id" => "t3", "title" => "Write docs", "completed" => false },
            fields! { "source" => "demo" },
        )
        .await?;
    actions
        .update_one(&Key::new("t1"), fields! { "completed" => true }, Fields::new())
        .await?;
    actions
        .update_one(&Key::new("t3"), fields! { "title" => "Write the docs" }, Fields::new())
        .await?;
    actions
        .add_one(
            fields! { "id" => "t4", "title" => "Typo", "completed" => false },
            Fields::new(),
        )
        .await?;
    actions
        .delete_one(&Key::new("t4"), fields! { "reason" => "typo" })
        .await?;
    actions
        .delete_one(&Key::new("t2"), Fields::new())
        .await?;
    info!(queued = outbox.len(), visible = todos.collection().len(), "offline edits done");

    let attempt = outbox.replay().await?;
    info!(failed = ?attempt.failed, remaining = attempt.remaining, "sync attempt while offline");

    api.set_offline(false);
    info!("network back");
    let replayed = attempt.replayed + outbox.drain().await?;

    let summary = Summary {
        local: todos.collection().values(),
        remote: api.todos(),
        replayed,
    };
    for todo in &summary.local {
        info!(?todo, "synced");
    }
    Ok(summary)
}
