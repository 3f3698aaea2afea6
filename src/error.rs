//! Error types for the manager and the tasks it supervises.

use std::fmt;

use thiserror::Error;

use crate::stats::ManagerStatusSnapshot;

/// What a captured task failure actually was.
pub enum FailureKind {
    /// The task's body returned an error.
    TaskError(Box<dyn std::error::Error + Send + Sync>),
    /// A daemon task returned cleanly, which is itself treated as a failure.
    DaemonExit,
}

impl fmt::Debug for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskError(err) => f.debug_tuple("TaskError").field(err).finish(),
            Self::DaemonExit => write!(f, "DaemonExit"),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskError(err) => write!(f, "{err}"),
            Self::DaemonExit => write!(f, "daemon task exited unexpectedly"),
        }
    }
}

/// One failure captured from a single managed task, tagged with its origin.
#[derive(Debug)]
pub struct CapturedFailure {
    pub task_name: String,
    pub kind: FailureKind,
}

impl fmt::Display for CapturedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}': {}", self.task_name, self.kind)
    }
}

impl CapturedFailure {
    /// True if this failure represents an unexpected daemon-task exit rather
    /// than an error returned from the task body.
    pub fn is_daemon_exit(&self) -> bool {
        matches!(self.kind, FailureKind::DaemonExit)
    }
}

/// Errors raised by the manager and surfaced to its callers.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A caller violated an API contract: double `run`, `cancel` before
    /// `started`, reading a task's runtime handle before it is bound, etc.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Raised to external callers when the service isn't in the running state,
    /// either at call time or because it stopped mid-call.
    #[error("cannot access external API {api}: service is not running ({status})")]
    ServiceCancelled {
        api: String,
        status: ManagerStatusSnapshot,
    },

    /// The composite outcome of a `run()` call that captured one or more
    /// task failures, in the order they were captured.
    #[error("service run failed with {count} error(s): {detail}", count = .0.len(), detail = format_failures(.0))]
    AggregateFailure(Vec<CapturedFailure>),
}

fn format_failures(failures: &[CapturedFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ManagerError {
    /// The captured failures if this is an `AggregateFailure`, else empty.
    pub fn failures(&self) -> &[CapturedFailure] {
        match self {
            Self::AggregateFailure(failures) => failures,
            _ => &[],
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
