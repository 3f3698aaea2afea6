//! End-to-end scenarios spanning Manager + Service + the external API guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use svc_supervisor::{call_external_api, ExternalApiError, Manager, ManagerError, ManagerSlot, Service};

#[derive(Debug, thiserror::Error)]
#[error("boom: {0}")]
struct TaskFailure(String);

struct CleanShutdown {
    slot: ManagerSlot<CleanShutdown>,
}

#[async_trait::async_trait]
impl Service for CleanShutdown {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn clean_shutdown() {
    let manager = Manager::new(CleanShutdown { slot: ManagerSlot::new() });
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });

    tokio::time::advance(Duration::from_millis(15)).await;
    handle.await.unwrap().unwrap();

    assert!(manager.is_finished());
    assert_eq!(manager.stats().total_count, 0);
}

struct ChildTaskError {
    slot: ManagerSlot<ChildTaskError>,
}

#[async_trait::async_trait]
impl Service for ChildTaskError {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let manager = self.get_manager().unwrap();
        manager.spawn_task("worker", false, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<(), TaskFailure>(TaskFailure("x".to_string()))
        })?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn child_task_error_aggregates_into_a_single_failure() {
    let manager = Manager::new(ChildTaskError { slot: ManagerSlot::new() });
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });

    tokio::time::advance(Duration::from_millis(20)).await;
    let err = handle.await.unwrap().unwrap_err();

    match err {
        ManagerError::AggregateFailure(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].task_name, "worker");
            assert!(!failures[0].is_daemon_exit());
            assert!(failures[0].to_string().contains("boom: x"));
        }
        other => panic!("expected AggregateFailure, got {other:?}"),
    }
    assert!(manager.is_finished());
}

struct UnexpectedDaemonExit {
    slot: ManagerSlot<UnexpectedDaemonExit>,
}

#[async_trait::async_trait]
impl Service for UnexpectedDaemonExit {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let manager = self.get_manager().unwrap();
        manager.spawn_task::<_, TaskFailure>("daemon", true, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        })?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn daemon_exits_unexpectedly() {
    let manager = Manager::new(UnexpectedDaemonExit { slot: ManagerSlot::new() });
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });

    tokio::time::advance(Duration::from_millis(20)).await;
    let err = handle.await.unwrap().unwrap_err();

    match err {
        ManagerError::AggregateFailure(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].is_daemon_exit());
        }
        other => panic!("expected AggregateFailure, got {other:?}"),
    }
}

struct NestedChain {
    slot: ManagerSlot<NestedChain>,
    order: Arc<StdMutex<Vec<&'static str>>>,
}

#[async_trait::async_trait]
impl Service for NestedChain {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let manager = self.get_manager().unwrap();
        let order_a = self.order.clone();
        manager.spawn_task::<_, TaskFailure>("a", false, async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            order_a.lock().unwrap().push("a");
            Ok(())
        })?;
        tokio::time::sleep(Duration::from_secs(10)).await;
        self.order.lock().unwrap().push("root");
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn nested_cancellation_never_lets_a_parent_finish_before_its_descendants() {
    let order = Arc::new(StdMutex::new(Vec::new()));
    let manager = Manager::new(NestedChain {
        slot: ManagerSlot::new(),
        order: order.clone(),
    });
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });

    manager.wait_started().await;
    tokio::time::advance(Duration::from_millis(10)).await;
    manager.cancel().unwrap();
    handle.await.unwrap().unwrap();

    assert!(manager.is_finished());
    // Neither body reached its post-sleep push: cancellation won both
    // selects before the 10s sleeps could elapse.
    assert!(order.lock().unwrap().is_empty());
}

struct ExternallyCallable {
    slot: ManagerSlot<ExternallyCallable>,
    call_started: Arc<AtomicBool>,
    result_tx: tokio::sync::mpsc::Sender<Result<u32, ExternalApiError<TaskFailure>>>,
}

#[async_trait::async_trait]
impl Service for ExternallyCallable {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let manager = self.get_manager().unwrap();
        let result_tx = self.result_tx.clone();
        let svc = manager.service();
        manager.spawn_task::<_, ExternalApiError<TaskFailure>>("caller", false, async move {
            let result = call_external_api(&*svc, "slow_operation", || svc.slow_operation()).await;
            let _ = result_tx.send(result).await;
            Ok(())
        })?;
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    }
}

impl ExternallyCallable {
    async fn slow_operation(&self) -> Result<u32, TaskFailure> {
        self.call_started.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(42)
    }
}

#[tokio::test(start_paused = true)]
async fn external_api_call_is_abandoned_when_the_service_starts_stopping() {
    let call_started = Arc::new(AtomicBool::new(false));
    let (result_tx, mut result_rx) = tokio::sync::mpsc::channel(1);
    let service = ExternallyCallable {
        slot: ManagerSlot::new(),
        call_started: call_started.clone(),
        result_tx,
    };
    let manager = Manager::new(service);
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });
    manager.wait_started().await;

    tokio::time::advance(Duration::from_millis(10)).await;
    manager.cancel().unwrap();

    let result = result_rx.recv().await.unwrap();
    assert!(matches!(result, Err(ExternalApiError::ServiceCancelled(_))));
    assert!(call_started.load(Ordering::SeqCst));

    handle.await.unwrap().unwrap();
}

struct DoubleRun {
    slot: ManagerSlot<DoubleRun>,
}

#[async_trait::async_trait]
impl Service for DoubleRun {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[tokio::test]
async fn second_run_is_rejected() {
    let manager = Manager::new(DoubleRun { slot: ManagerSlot::new() });
    manager.run().await.unwrap();
    let err = manager.run().await.unwrap_err();
    assert!(matches!(err, ManagerError::Lifecycle(_)));
}
