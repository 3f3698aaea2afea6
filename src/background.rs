//! Running a service as a scoped background task: start it, hand the
//! manager to a body closure, and guarantee it's stopped by the time this
//! returns — even if the body panics.

use std::future::Future;

use crate::error::ManagerResult;
use crate::manager::Manager;
use crate::service::Service;

/// Drop guard that spawns a detached `stop()` if the manager was never
/// explicitly stopped. Can't await a full shutdown from `Drop`, so this is
/// a best-effort net for the panic path only; the normal-exit path in
/// `background_service` always awaits `stop()` directly instead of relying
/// on this.
struct StopOnDrop<S: Service> {
    manager: Option<Manager<S>>,
}

impl<S: Service> Drop for StopOnDrop<S> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.take() {
            tokio::spawn(async move {
                let _ = manager.stop().await;
            });
        }
    }
}

impl<S: Service> StopOnDrop<S> {
    fn disarm(mut self) {
        self.manager = None;
    }
}

/// Run `service` in the background for the duration of `body`, then stop it.
///
/// Starts the manager, waits for it to report `started`, then runs `body`
/// with the manager handle. Once `body` resolves (or panics), the service is
/// stopped and its `run()` outcome is awaited; a run-time failure is logged
/// but does not shadow `body`'s own result.
pub async fn background_service<S, F, Fut, T>(service: S, body: F) -> ManagerResult<T>
where
    S: Service,
    F: FnOnce(Manager<S>) -> Fut,
    Fut: Future<Output = T>,
{
    let manager = Manager::new(service);
    let guard = StopOnDrop {
        manager: Some(manager.clone()),
    };

    let run_manager = manager.clone();
    let run_handle = tokio::spawn(async move { run_manager.run().await });

    manager.wait_started().await;
    let result = body(manager.clone()).await;

    manager.stop().await?;
    guard.disarm();

    match run_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "background service run finished with errors"),
        Err(join_err) => tracing::warn!(error = %join_err, "background service run task panicked"),
    }

    Ok(result)
}
