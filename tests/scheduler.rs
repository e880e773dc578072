mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use attendance_sync::model::attendance::RecordKind;
use attendance_sync::sync::{OutboxCollector, Scheduler, SchedulerConfig, SyncEvent};

use common::harness;

fn hourly() -> SchedulerConfig {
    SchedulerConfig {
        probe_interval: Duration::from_secs(3600),
        sync_interval: Duration::from_secs(3600),
        gc_interval: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn first_successful_probe_flushes_offline_work() -> Result<(), Box<dyn std::error::Error>> {
    let h = harness(false).await;
    let record = h
        .coordinator
        .record_attendance(4, RecordKind::CheckIn)
        .await?
        .record;

    let mut events = h.coordinator.subscribe();
    let scheduler = Scheduler::spawn(
        Arc::clone(&h.coordinator),
        OutboxCollector::with_default_retention(h.store.clone()),
        hourly(),
    );

    let synced = timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::AttendanceSynced { record_id }) => break record_id,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await?;

    assert_eq!(synced, record.id);
    assert!(h.connectivity.is_reachable());
    assert_eq!(h.store.count_unsynced_attendance().await?, 0);

    scheduler.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn dead_remote_keeps_the_client_offline() -> Result<(), Box<dyn std::error::Error>> {
    let h = harness(false).await;
    h.gateway.set_alive(false);
    h.coordinator
        .record_attendance(4, RecordKind::CheckOut)
        .await?;

    let scheduler = Scheduler::spawn(
        Arc::clone(&h.coordinator),
        OutboxCollector::with_default_retention(h.store.clone()),
        hourly(),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!h.connectivity.is_reachable());
    assert_eq!(h.store.count_unsynced_attendance().await?, 1);

    timeout(Duration::from_secs(5), scheduler.shutdown()).await?;
    Ok(())
}
