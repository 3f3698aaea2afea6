//! Task identity and per-task lifecycle state tracked by the manager.

use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ManagerError, ManagerResult};
use crate::sync::OnceEvent;

/// Globally unique, opaque task identity. Equality and hashing are by id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the task DAG: immutable identity plus mutable lifecycle state.
///
/// `parent` is a weak relation — ownership of a task's lifetime belongs to
/// the [`TaskDag`](crate::dag::TaskDag), not to the parent node.
pub struct TaskNode {
    id: TaskId,
    name: String,
    daemon: bool,
    parent: Option<TaskId>,
    cancel_token: CancellationToken,
    done: OnceEvent,
    runtime_id: OnceLock<tokio::task::Id>,
}

impl TaskNode {
    /// Create a new node. `scope_token` is the cancellation token this task's
    /// own token is derived from — the parent task's token for a child, or
    /// the manager's task-scope token for a root. Deriving from it means a
    /// cancellation of `scope_token` cascades even to tasks whose own
    /// cancellation step hasn't run yet.
    pub(crate) fn new(
        name: impl Into<String>,
        daemon: bool,
        parent: Option<TaskId>,
        scope_token: &CancellationToken,
    ) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            daemon,
            parent,
            cancel_token: scope_token.child_token(),
            done: OnceEvent::new(),
            runtime_id: OnceLock::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn is_done(&self) -> bool {
        self.done.is_set()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    pub(crate) async fn wait_done(&self) {
        self.done.wait().await
    }

    pub(crate) fn mark_done(&self) {
        self.done.set();
    }

    /// Bind this node to the runtime task that is executing its body.
    /// A no-op if already bound (the contract is "set at most once"; a
    /// second bind attempt is a programming error inside this crate, never
    /// user-observable, so it is silently ignored rather than panicking).
    pub(crate) fn bind_runtime_id(&self, id: tokio::task::Id) {
        let _ = self.runtime_id.set(id);
    }

    pub(crate) fn try_runtime_id(&self) -> Option<tokio::task::Id> {
        self.runtime_id.get().copied()
    }

    /// The runtime task id backing this node, failing if the task hasn't
    /// started executing yet.
    pub fn runtime_id(&self) -> ManagerResult<tokio::task::Id> {
        self.runtime_id.get().copied().ok_or_else(|| {
            ManagerError::Lifecycle(format!(
                "runtime handle for task '{}' is not set yet",
                self.name
            ))
        })
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
