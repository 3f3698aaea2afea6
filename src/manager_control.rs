//! `Manager` control surface: `run`, `cancel`, `stop`, and task spawning.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{ManagerError, ManagerResult};
use crate::manager::Manager;
use crate::manager_internal::{run_cancellation_handler, run_managed};
use crate::service::Service;
use crate::task::TaskNode;

impl<S: Service> Manager<S> {
    /// Run the service body as the DAG root, supervise it and every task it
    /// (transitively) spawns, and return once everything has settled.
    ///
    /// Fails with `ManagerError::Lifecycle` if the manager was already
    /// started, or if a concurrent `run` call is already in flight. On
    /// clean completion with no captured failures, returns `Ok(())`;
    /// otherwise returns `ManagerError::AggregateFailure`.
    pub async fn run(&self) -> ManagerResult<()> {
        let _run_guard = self.0.run_lock.try_lock().map_err(|_| {
            ManagerError::Lifecycle(
                "cannot run a service with the run lock already engaged; already started?".into(),
            )
        })?;
        if self.0.state.is_started() {
            return Err(ManagerError::Lifecycle(
                "cannot run a service which is already started".into(),
            ));
        }

        let root = Arc::new(TaskNode::new("run", false, None, &self.0.task_scope_token));
        {
            let mut dag = self.0.dag.lock().unwrap();
            dag.insert(root.clone());
            self.0.active_tasks.fetch_add(1, Ordering::SeqCst);
        }

        let cancellation_handler = tokio::spawn(run_cancellation_handler(self.0.clone()));

        let service = self.0.service.clone();
        tokio::spawn(run_managed(self.0.clone(), root, async move {
            service.run().await
        }));

        self.0.state.started.set();
        tracing::debug!(manager = %self.0.name, "manager started");

        wait_drained(&self.0).await;

        // Collapses the cancellation handler if it's still parked waiting
        // for a `cancelled` that never came (clean shutdown).
        self.0.system_scope_token.cancel();
        let _ = cancellation_handler.await;

        self.0.state.stopping.set();
        tracing::debug!(manager = %self.0.name, "manager stopping");
        self.0.state.finished.set();
        tracing::debug!(manager = %self.0.name, "manager finished");

        let failures = std::mem::take(&mut *self.0.errors.lock().unwrap());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ManagerError::AggregateFailure(failures))
        }
    }

    /// Request cancellation. Idempotent. Fails if the manager was never
    /// started; a no-op (not an error) if it is started but no longer running.
    pub fn cancel(&self) -> ManagerResult<()> {
        if !self.0.state.is_started() {
            return Err(ManagerError::Lifecycle(
                "cannot cancel a service which was never started".into(),
            ));
        }
        self.trigger_cancel();
        Ok(())
    }

    /// `cancel()` followed by waiting for `finished`.
    pub async fn stop(&self) -> ManagerResult<()> {
        self.cancel()?;
        self.wait_finished().await;
        Ok(())
    }

    pub(crate) fn trigger_cancel(&self) {
        if self.0.state.is_running() {
            if !self.0.state.is_cancelled() {
                tracing::debug!(manager = %self.0.name, "cancellation requested");
            }
            self.0.state.cancelled.set();
        }
    }

    /// Schedule `fut` as a new task under this manager. Non-blocking: the
    /// task is handed to the runtime and this returns immediately.
    ///
    /// The parent is inferred from the currently executing runtime task
    /// (see §4.4); if none of the DAG's nodes match, the new task becomes a
    /// root of its own.
    pub fn spawn_task<F, E>(&self, name: impl Into<String>, daemon: bool, fut: F) -> ManagerResult<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        if !self.0.state.is_running() {
            return Err(ManagerError::Lifecycle(
                "tasks may not be scheduled if the service is not running".into(),
            ));
        }

        let name = name.into();
        if self.0.state.is_cancelled() {
            tracing::warn!(task = %name, daemon, "service is cancelling; dropping spawn request");
            return Ok(());
        }

        let current_runtime_id = tokio::task::try_id();
        let node = {
            // Insert and the active-task increment happen under the same
            // guard `wait_drained` locks for its own zero-check, so a
            // drain can never observe zero between this task being
            // accepted and it actually landing in the DAG.
            let mut dag = self.0.dag.lock().unwrap();
            let parent_id = current_runtime_id.and_then(|id| dag.parent_of(id));
            let parent_token = parent_id
                .and_then(|id| dag.node(id).map(|n| n.cancel_token().clone()))
                .unwrap_or_else(|| self.0.task_scope_token.clone());

            if parent_id.is_none() {
                tracing::debug!(task = %name, "new root task added to DAG");
            } else {
                tracing::debug!(task = %name, "new child task added to DAG");
            }

            let node = Arc::new(TaskNode::new(name, daemon, parent_id, &parent_token));
            dag.insert(node.clone());
            self.0.active_tasks.fetch_add(1, Ordering::SeqCst);
            node
        };

        tokio::spawn(run_managed(self.0.clone(), node, fut));
        Ok(())
    }

    /// Construct a child manager of the same kind over `service` and
    /// schedule its `run` as a task of this manager. Returns the child
    /// manager immediately, without waiting for it to start.
    pub fn spawn_child_service<C>(
        &self,
        service: C,
        daemon: bool,
        name: Option<String>,
    ) -> ManagerResult<Manager<C>>
    where
        C: Service,
    {
        let child = Manager::new(service);
        let task_name = name.unwrap_or_else(|| format!("child-service<{}>", std::any::type_name::<C>()));
        let run_child = child.clone();
        self.spawn_task(task_name, daemon, async move { run_child.run().await })?;
        Ok(child)
    }
}

async fn wait_drained<S: Service>(inner: &crate::manager::ManagerInner<S>) {
    loop {
        // Hold the same dag lock `spawn_task` holds across its insert and
        // increment, so this check can never land in the gap between a
        // racing spawn's precondition check and its `fetch_add`.
        {
            let _dag = inner.dag.lock().unwrap();
            if inner.active_tasks.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
        let notified = inner.drained.notified();
        {
            let _dag = inner.dag.lock().unwrap();
            if inner.active_tasks.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
        notified.await;
    }
}

#[cfg(test)]
#[path = "manager_control_tests.rs"]
mod tests;
