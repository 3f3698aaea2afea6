//! The manager: lifecycle state machine, task DAG ownership, and the
//! control surface exposed to services and external callers.
//!
//! The control operations (`run`, `cancel`, `spawn_task`, `spawn_child_service`)
//! live in [`crate::manager_control`]; the cancellation handler and the
//! managed-task wrapper live in [`crate::manager_internal`]. Both are
//! `impl Manager<S>` blocks over the types defined here, mirroring how this
//! codebase splits a large component's behavior across sibling files while
//! keeping one canonical struct definition.

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::dag::TaskDag;
use crate::error::CapturedFailure;
use crate::service::Service;
use crate::stats::{ManagerStatusSnapshot, Stats};
use crate::sync::OnceEvent;

pub(crate) struct ManagerState {
    pub(crate) started: OnceEvent,
    pub(crate) cancelled: OnceEvent,
    pub(crate) stopping: OnceEvent,
    pub(crate) finished: OnceEvent,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            started: OnceEvent::new(),
            cancelled: OnceEvent::new(),
            stopping: OnceEvent::new(),
            finished: OnceEvent::new(),
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.is_set()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.is_set()
    }

    pub(crate) fn is_stopping_raw(&self) -> bool {
        self.stopping.is_set()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.is_set()
    }

    /// `running := started && !stopping && !finished`.
    pub(crate) fn is_running(&self) -> bool {
        self.is_started() && !self.is_stopping_raw() && !self.is_finished()
    }
}

pub(crate) struct ManagerInner<S: Service> {
    pub(crate) service: Arc<S>,
    pub(crate) state: ManagerState,
    pub(crate) dag: Mutex<TaskDag>,
    pub(crate) errors: Mutex<Vec<CapturedFailure>>,
    pub(crate) run_lock: tokio::sync::Mutex<()>,
    /// Cancelling this cascades to every task's own token that hasn't
    /// already been individually cancelled by the cancellation handler —
    /// the "nothing left behind" safety net described in §4.2.
    pub(crate) task_scope_token: CancellationToken,
    /// Collapsed once the task scope has drained, to release the
    /// cancellation-handler task if it never had anything to do.
    pub(crate) system_scope_token: CancellationToken,
    pub(crate) active_tasks: AtomicUsize,
    pub(crate) drained: Notify,
    pub(crate) name: String,
}

/// Supervises the lifecycle and task DAG of one `Service` instance.
///
/// Cheaply `Clone`-able; all clones refer to the same underlying manager.
pub struct Manager<S: Service>(pub(crate) Arc<ManagerInner<S>>);

impl<S: Service> Clone for Manager<S> {
    fn clone(&self) -> Self {
        Manager(self.0.clone())
    }
}

/// A non-owning reference to a [`Manager`], used to break the Service <->
/// Manager ownership cycle (see [`crate::service::ManagerSlot`]).
pub struct WeakManager<S: Service>(Weak<ManagerInner<S>>);

impl<S: Service> Clone for WeakManager<S> {
    fn clone(&self) -> Self {
        WeakManager(self.0.clone())
    }
}

impl<S: Service> WeakManager<S> {
    pub fn upgrade(&self) -> Option<Manager<S>> {
        self.0.upgrade().map(Manager)
    }
}

impl<S: Service> Manager<S> {
    /// Construct a manager over `service`. The service is not run until
    /// [`Manager::run`] is awaited.
    pub fn new(service: S) -> Self {
        let inner = Arc::new(ManagerInner {
            service: Arc::new(service),
            state: ManagerState::new(),
            dag: Mutex::new(TaskDag::new()),
            errors: Mutex::new(Vec::new()),
            run_lock: tokio::sync::Mutex::new(()),
            task_scope_token: CancellationToken::new(),
            system_scope_token: CancellationToken::new(),
            active_tasks: AtomicUsize::new(0),
            drained: Notify::new(),
            name: std::any::type_name::<S>().to_string(),
        });
        let manager = Manager(inner);
        manager.0.service.manager_slot().bind(manager.downgrade());
        manager
    }

    pub fn downgrade(&self) -> WeakManager<S> {
        WeakManager(Arc::downgrade(&self.0))
    }

    /// A shared handle to the service this manager supervises. Cloning this
    /// (rather than capturing `&self` inside a `Service::run` body) is how a
    /// service obtains an owned, `'static` reference to itself for tasks it
    /// spawns via `spawn_task`.
    pub fn service(&self) -> Arc<S> {
        self.0.service.clone()
    }

    pub fn is_started(&self) -> bool {
        self.0.state.is_started()
    }

    pub fn is_running(&self) -> bool {
        self.0.state.is_running()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.state.is_cancelled()
    }

    /// `stopping && !finished`, matching the public, human-facing meaning
    /// of "currently shutting down" rather than the raw monotonic flag.
    pub fn is_stopping(&self) -> bool {
        self.0.state.is_stopping_raw() && !self.0.state.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.0.state.is_finished()
    }

    pub async fn wait_started(&self) {
        self.0.state.started.wait().await
    }

    pub async fn wait_stopping(&self) {
        self.0.state.stopping.wait().await
    }

    pub async fn wait_finished(&self) {
        self.0.state.finished.wait().await
    }

    /// `{ total_count, finished_count }` over the task DAG, excluding the
    /// service body task. See §4.1 and the open question in DESIGN.md about
    /// the transient window where `finished_count` is clamped.
    pub fn stats(&self) -> Stats {
        let dag = self.0.dag.lock().unwrap();
        let total_count = dag.len().saturating_sub(1);
        let finished_count = dag.nodes().filter(|n| n.is_done()).count().min(total_count);
        Stats {
            total_count,
            finished_count,
        }
    }

    pub fn status_snapshot(&self) -> ManagerStatusSnapshot {
        ManagerStatusSnapshot {
            started: self.is_started(),
            running: self.is_running(),
            stopping: self.is_stopping(),
            finished: self.is_finished(),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
