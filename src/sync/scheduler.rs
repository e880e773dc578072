use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use super::{OutboxCollector, SyncCoordinator};
use crate::connectivity::ConnectivityEvent;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub probe_interval: Duration,
    pub sync_interval: Duration,
    pub gc_interval: Duration,
}

/// Background loops around a coordinator: liveness probing, replay on
/// reconnect, periodic replay and outbox collection.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn(
        coordinator: Arc<SyncCoordinator>,
        collector: OutboxCollector,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        // subscribed before the first probe can raise an edge
        let events = coordinator.connectivity().subscribe();

        let tasks = vec![
            tokio::spawn(probe_loop(
                Arc::clone(&coordinator),
                config.probe_interval,
                shutdown.subscribe(),
            )),
            tokio::spawn(reconnect_loop(
                Arc::clone(&coordinator),
                events,
                shutdown.subscribe(),
            )),
            tokio::spawn(replay_loop(
                coordinator,
                config.sync_interval,
                shutdown.subscribe(),
            )),
            tokio::spawn(gc_loop(collector, config.gc_interval, shutdown.subscribe())),
        ];

        Self { shutdown, tasks }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

async fn replay_logged(coordinator: &SyncCoordinator) {
    match coordinator.replay().await {
        Ok(status) => info!(?status, "Replay pass"),
        Err(e) => error!(error = %e, "Replay pass aborted"),
    }
}

async fn probe_loop(
    coordinator: Arc<SyncCoordinator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let alive = coordinator.probe_remote().await;
                coordinator.connectivity().set_reachable(alive);
            }
        }
    }
}

async fn reconnect_loop(
    coordinator: Arc<SyncCoordinator>,
    mut events: broadcast::Receiver<ConnectivityEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Ok(ConnectivityEvent::BecameReachable) => replay_logged(&coordinator).await,
                Ok(ConnectivityEvent::BecameUnreachable) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // the flag is current even if edges were missed
                    info!(missed, "Connectivity events lagged");
                    if coordinator.connectivity().is_reachable() {
                        replay_logged(&coordinator).await;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

async fn replay_loop(
    coordinator: Arc<SyncCoordinator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately; startup is covered by the probe edge
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => replay_logged(&coordinator).await,
        }
    }
}

async fn gc_loop(collector: OutboxCollector, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if let Err(e) = collector.collect().await {
                    error!(error = %e, "Outbox collection failed");
                }
            }
        }
    }
}
