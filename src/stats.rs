//! Observability snapshots exposed by the manager.

use std::fmt;

/// A point-in-time snapshot of the task DAG's size and completion progress.
///
/// `total_count` excludes the service body itself (it is tracked in the DAG
/// like any other task, but isn't meaningful to report as "one more task").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Number of tasks spawned via `spawn_task`/`spawn_child_service`, excluding the service body.
    pub total_count: usize,
    /// Number of those tasks whose `done` event has fired.
    pub finished_count: usize,
}

/// A snapshot of the manager's lifecycle flags, used to explain why an
/// external API call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStatusSnapshot {
    pub started: bool,
    pub running: bool,
    pub stopping: bool,
    pub finished: bool,
}

impl fmt::Display for ManagerStatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "started={} running={} stopping={} finished={}",
            self.started, self.running, self.stopping, self.finished
        )
    }
}
