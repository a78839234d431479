//! # Task registry: live task actors of one execution.
//!
//! The registry owns one handle (join handle + cancellation token) per submitted task,
//! keyed by [`TaskId`].
//!
//! ```text
//! Execution::submit()      ─► spawn(actor)  ─► tokio::spawn(actor.run(child token))
//! Execution::cancel_task() ─► cancel(id)    ─► child token cancelled
//! Execution::wait()        ─► take_joins()  ─► join handles awaited by the execution
//!                          ─► remove(id)    ─► once the actor has been collected
//! ```
//!
//! ## Rules
//! - A task id is unique while its handle is registered; a second submit is rejected.
//! - An entry stays registered (and cancellable) until its actor is collected.
//! - Every task token is a child of the execution token.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::TaskActor;
use crate::core::report::TaskReport;
use crate::error::RuntimeError;
use crate::tasks::TaskId;

struct Handle {
    /// `None` once handed to a waiter.
    join: Option<JoinHandle<TaskReport>>,
    cancel: CancellationToken,
}

/// Registry of spawned task actors.
pub(crate) struct Registry {
    tasks: RwLock<HashMap<TaskId, Handle>>,
    runtime_token: CancellationToken,
}

impl Registry {
    pub fn new(runtime_token: CancellationToken) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            runtime_token,
        }
    }

    /// Spawns the actor under a child token and registers it.
    pub async fn spawn(&self, actor: TaskActor) -> Result<(), RuntimeError> {
        let id = actor.id().clone();
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&id) {
            return Err(RuntimeError::DuplicateTask {
                task: id.to_string(),
            });
        }

        let cancel = self.runtime_token.child_token();
        let join = tokio::spawn(actor.run(cancel.clone()));
        tasks.insert(
            id,
            Handle {
                join: Some(join),
                cancel,
            },
        );
        Ok(())
    }

    /// Cancels one task. Returns `false` if the id is not registered.
    pub async fn cancel(&self, id: &TaskId) -> bool {
        match self.tasks.read().await.get(id) {
            Some(h) => {
                h.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Moves out every join handle not yet taken. Entries stay registered.
    pub async fn take_joins(&self) -> Vec<(TaskId, JoinHandle<TaskReport>)> {
        let mut tasks = self.tasks.write().await;
        tasks
            .iter_mut()
            .filter_map(|(id, h)| h.join.take().map(|join| (id.clone(), join)))
            .collect()
    }

    /// Unregisters a collected task, freeing its id.
    pub async fn remove(&self, id: &TaskId) {
        self.tasks.write().await.remove(id);
    }

    /// Returns sorted list of registered task ids.
    pub async fn list(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut ids: Vec<String> = tasks.keys().map(TaskId::to_string).collect();
        ids.sort_unstable();
        ids
    }
}
