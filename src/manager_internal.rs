//! The managed-task wrapper and the cancellation handler.
//!
//! Both are spawned by `Manager::run`/`Manager::spawn_task` in
//! `manager_control` but live here to keep the bookkeeping they share
//! (the active-task count, the error buffer) next to each other.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{CapturedFailure, FailureKind};
use crate::manager::ManagerInner;
use crate::service::Service;
use crate::task::TaskNode;

/// RAII guard held for the lifetime of a managed task's body. Its `Drop`
/// impl is what actually sets `done` and releases the active-task count —
/// running on every exit path, including an unexpected panic unwind, not
/// just the happy path — which is what makes `done` a true "this task is
/// over, by any means" signal rather than something only the success path
/// remembers to fire.
struct ActiveGuard<S: Service> {
    manager: Arc<ManagerInner<S>>,
    node: Arc<TaskNode>,
}

impl<S: Service> Drop for ActiveGuard<S> {
    fn drop(&mut self) {
        self.node.mark_done();
        let remaining = self.manager.active_tasks.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.manager.drained.notify_waiters();
        }
    }
}

/// Run one task's body under its own cancellation scope, capturing errors
/// and daemon-exits into the manager's error buffer and triggering
/// cancellation of the whole service when either occurs.
pub(crate) async fn run_managed<S, Fut, E>(manager: Arc<ManagerInner<S>>, node: Arc<TaskNode>, fut: Fut)
where
    S: Service,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    node.bind_runtime_id(tokio::task::id());
    let _guard = ActiveGuard {
        manager: manager.clone(),
        node: node.clone(),
    };

    let token = node.cancel_token().clone();
    tracing::debug!(task = %node.name(), daemon = node.is_daemon(), "task started");

    let outcome = tokio::select! {
        res = fut => Some(res),
        _ = token.cancelled() => None,
    };

    match outcome {
        None => {
            tracing::debug!(task = %node.name(), "task cancelled");
        }
        Some(Ok(())) => {
            if node.is_daemon() {
                tracing::warn!(
                    task = %node.name(),
                    "daemon task exited unexpectedly; cancelling service"
                );
                record_failure(&manager, node.name(), FailureKind::DaemonExit);
                trigger_cancel(&manager);
            } else {
                tracing::debug!(task = %node.name(), "task finished cleanly");
            }
        }
        Some(Err(err)) => {
            tracing::error!(task = %node.name(), error = %err, "task failed");
            record_failure(&manager, node.name(), FailureKind::TaskError(Box::new(err)));
            trigger_cancel(&manager);
        }
    }
}

/// Waits for `cancelled`, then drains the task DAG leaves-first, then
/// collapses the task scope. Runs in the manager's "system scope": a
/// cancellation of `system_scope_token` before `cancelled` ever fires means
/// the service shut down cleanly and this handler has nothing to do.
pub(crate) async fn run_cancellation_handler<S: Service>(manager: Arc<ManagerInner<S>>) {
    tokio::select! {
        _ = manager.state.cancelled.wait() => {}
        _ = manager.system_scope_token.cancelled() => {
            return;
        }
    }

    tracing::debug!(manager = %manager.name, "cancellation handler draining task DAG");
    let order = {
        let dag = manager.dag.lock().unwrap();
        dag.reverse_topological()
    };
    for node in order {
        node.cancel_token().cancel();
        node.wait_done().await;
    }

    // Belt-and-suspenders: anything not reachable through the DAG snapshot
    // above (a task spawned in the narrow window around cancellation) is
    // still caught here, since every task's token is a descendant of this one.
    manager.task_scope_token.cancel();
    tracing::debug!(manager = %manager.name, "cancellation handler finished draining");
}

fn record_failure<S: Service>(manager: &ManagerInner<S>, task_name: &str, kind: FailureKind) {
    manager.errors.lock().unwrap().push(CapturedFailure {
        task_name: task_name.to_string(),
        kind,
    });
}

fn trigger_cancel<S: Service>(manager: &ManagerInner<S>) {
    if manager.state.is_running() {
        manager.state.cancelled.set();
    }
}
