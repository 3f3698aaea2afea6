use super::*;
use crate::service::ManagerSlot;
use std::time::Duration;

struct Idle {
    slot: ManagerSlot<Idle>,
}

#[async_trait::async_trait]
impl Service for Idle {
    fn manager_slot(&self) -> &ManagerSlot<Self> {
        &self.slot
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[tokio::test]
async fn fresh_manager_reports_no_lifecycle_flags_set() {
    let manager = Manager::new(Idle { slot: ManagerSlot::new() });
    assert!(!manager.is_started());
    assert!(!manager.is_running());
    assert!(!manager.is_finished());
}

#[tokio::test]
async fn new_binds_a_weak_manager_into_the_service_slot() {
    let manager = Manager::new(Idle { slot: ManagerSlot::new() });
    assert!(manager.0.service.get_manager().is_some());
}

#[tokio::test]
async fn run_to_completion_sets_all_lifecycle_flags_in_order() {
    let manager = Manager::new(Idle { slot: ManagerSlot::new() });
    manager.run().await.unwrap();
    assert!(manager.is_started());
    assert!(manager.is_finished());
    assert!(!manager.is_running());
}

#[tokio::test]
async fn stats_excludes_the_service_body_task() {
    let manager = Manager::new(Idle { slot: ManagerSlot::new() });
    manager.run().await.unwrap();
    let stats = manager.stats();
    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.finished_count, 0);
}

#[tokio::test]
async fn status_snapshot_matches_individual_accessors() {
    tokio::time::pause();
    struct Sleeper {
        slot: ManagerSlot<Sleeper>,
    }

    #[async_trait::async_trait]
    impl Service for Sleeper {
        fn manager_slot(&self) -> &ManagerSlot<Self> {
            &self.slot
        }

        async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        }
    }

    let manager = Manager::new(Sleeper { slot: ManagerSlot::new() });
    let run_manager = manager.clone();
    let handle = tokio::spawn(async move { run_manager.run().await });
    manager.wait_started().await;

    let snapshot = manager.status_snapshot();
    assert_eq!(snapshot.started, manager.is_started());
    assert_eq!(snapshot.running, manager.is_running());
    assert_eq!(snapshot.stopping, manager.is_stopping());
    assert_eq!(snapshot.finished, manager.is_finished());
    assert!(snapshot.running);

    manager.stop().await.unwrap();
    handle.await.unwrap().unwrap();
}
