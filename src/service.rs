//! The `Service` contract implemented by user code, and the back-reference
//! slot used to break the Service <-> Manager ownership cycle.

use std::sync::OnceLock;

use crate::manager::{Manager, WeakManager};

/// Holds a weak back-reference from a [`Service`] to the [`Manager`] that
/// was constructed over it.
///
/// A `Service` implementation embeds one of these as a field and returns it
/// from [`Service::manager_slot`]. The manager binds it exactly once, at
/// construction time; see `Manager::new`. Using a weak reference (rather
/// than a strong `Arc<Manager<_>>`) avoids the reference cycle a direct
/// back-pointer would create, since the manager itself holds an `Arc` over
/// the service.
pub struct ManagerSlot<S> {
    inner: OnceLock<WeakManager<S>>,
}

impl<S> ManagerSlot<S> {
    pub fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }
}

impl<S> Default for ManagerSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Service> ManagerSlot<S> {
    pub(crate) fn bind(&self, manager: WeakManager<S>) {
        // Bound exactly once, by `Manager::new`, right after construction.
        let _ = self.inner.set(manager);
    }

    pub fn get(&self) -> Option<Manager<S>> {
        self.inner.get().and_then(WeakManager::upgrade)
    }
}

/// A long-running unit of work supervised by a [`Manager`].
///
/// Implementations spawn additional tasks from within `run` via
/// `self.get_manager().unwrap().spawn_task(...)`; `get_manager` only
/// returns `None` before the service has been handed to a `Manager`.
#[async_trait::async_trait]
pub trait Service: Send + Sync + Sized + 'static {
    /// Expose the back-reference slot the manager binds at construction time.
    fn manager_slot(&self) -> &ManagerSlot<Self>;

    /// The service's long-running body. A clean return signals "done"; an
    /// error signals failure and triggers cancellation of the whole service.
    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// The manager attached to this service, if it has been run (or is
    /// currently being run) by one.
    fn get_manager(&self) -> Option<Manager<Self>> {
        self.manager_slot().get()
    }
}
