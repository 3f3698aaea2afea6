//! Structured-concurrency supervision for long-running services.
//!
//! A [`Service`] implements one long-running body (`run`). A [`Manager`]
//! drives it: starts it as the root of a task DAG, lets it (and the tasks it
//! spawns, transitively) schedule further tasks through `spawn_task`, and
//! tears the whole tree down leaves-first the moment anything fails, any
//! non-daemon root finishes, or any daemon task exits unexpectedly.
//!
//! ```text
//!  Manager<S>
//!   ├─ ManagerState        started / cancelled / stopping / finished
//!   ├─ TaskDag              parent -> children, for cancellation ordering
//!   └─ Service (S)         user code; spawns tasks via its own Manager handle
//!       ├─ task "a"
//!       │   └─ task "a.1"
//!       └─ task "b"  (daemon)
//! ```
//!
//! ## Key components
//!
//! - [`Service`] / [`ManagerSlot`] — the contract user code implements, and
//!   the back-reference slot that lets a service reach its own manager.
//! - [`Manager`] — lifecycle state machine, task DAG, control surface
//!   (`run`, `cancel`, `stop`, `spawn_task`, `spawn_child_service`).
//! - [`call_external_api`] — guards a call made into a running service from
//!   outside its supervised tasks against the service shutting down mid-call.
//! - [`background_service`] — runs a service for the scope of a closure and
//!   guarantees it is stopped before returning.
//!
//! ## Example
//!
//! ```ignore
//! use svc_supervisor::{Manager, ManagerSlot, Service};
//!
//! struct Echo {
//!     slot: ManagerSlot<Echo>,
//! }
//!
//! #[async_trait::async_trait]
//! impl Service for Echo {
//!     fn manager_slot(&self) -> &ManagerSlot<Self> {
//!         &self.slot
//!     }
//!
//!     async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!         let manager = self.get_manager().unwrap();
//!         manager.spawn_task("worker", false, async { Ok(()) })?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn doc() {
//! let manager = Manager::new(Echo { slot: ManagerSlot::new() });
//! manager.run().await.unwrap();
//! # }
//! ```

mod background;
mod dag;
mod error;
mod external_api;
mod manager;
mod manager_control;
mod manager_internal;
mod service;
mod stats;
mod sync;
mod task;

pub use background::background_service;
pub use error::{CapturedFailure, FailureKind, ManagerError, ManagerResult};
pub use external_api::{call_external_api, ExternalApiError};
pub use manager::{Manager, WeakManager};
pub use service::{ManagerSlot, Service};
pub use stats::{ManagerStatusSnapshot, Stats};
pub use task::{TaskId, TaskNode};
