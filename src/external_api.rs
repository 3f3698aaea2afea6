//! Guarding calls into external APIs that a running service exposes to
//! callers outside its own supervised tasks (HTTP handlers, RPC methods,
//! anything not spawned through `spawn_task`).

use std::future::Future;

use thiserror::Error;

use crate::error::ManagerError;
use crate::service::Service;
use crate::stats::ManagerStatusSnapshot;

/// The outcome of a guarded external API call: either the service stopped
/// out from under it, or the call itself failed.
#[derive(Debug, Error)]
pub enum ExternalApiError<E> {
    #[error(transparent)]
    ServiceCancelled(#[from] ManagerError),
    #[error(transparent)]
    Failed(E),
}

/// Run `body` on behalf of an external caller, racing it against the
/// service's shutdown. If the manager starts stopping before `body`
/// resolves, the call is abandoned and `ServiceCancelled` is returned
/// instead of whatever `body` would have produced.
///
/// Also rejected upfront if the service has no manager attached yet, or is
/// not currently running.
pub async fn call_external_api<S, Fut, T, E>(
    service: &S,
    api_name: &str,
    body: impl FnOnce() -> Fut,
) -> Result<T, ExternalApiError<E>>
where
    S: Service,
    Fut: Future<Output = Result<T, E>>,
{
    let manager = match service.get_manager() {
        Some(manager) => manager,
        None => {
            return Err(ExternalApiError::ServiceCancelled(ManagerError::ServiceCancelled {
                api: api_name.to_string(),
                status: ManagerStatusSnapshot::default(),
            }))
        }
    };

    if !manager.is_running() {
        return Err(ExternalApiError::ServiceCancelled(ManagerError::ServiceCancelled {
            api: api_name.to_string(),
            status: manager.status_snapshot(),
        }));
    }

    tokio::select! {
        result = body() => result.map_err(ExternalApiError::Failed),
        _ = manager.wait_stopping() => {
            tracing::debug!(api = api_name, "external API call abandoned: service is stopping");
            Err(ExternalApiError::ServiceCancelled(ManagerError::ServiceCancelled {
                api: api_name.to_string(),
                status: manager.status_snapshot(),
            }))
        }
    }
}
