use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameReachable,
    BecameUnreachable,
}

/// Best-effort reachability signal. Events fire only on transitions, so
/// reporting the same state twice is silent.
///
/// Being reachable is necessary for a push, never proof that one will work.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    reachable: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    pub fn new(initially_reachable: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                reachable: AtomicBool::new(initially_reachable),
                events,
            }),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::Acquire)
    }

    /// Records the latest observation and returns the edge it caused, if any.
    pub fn set_reachable(&self, reachable: bool) -> Option<ConnectivityEvent> {
        let previous = self.inner.reachable.swap(reachable, Ordering::AcqRel);
        if previous == reachable {
            return None;
        }

        let event = if reachable {
            info!("Network became reachable");
            ConnectivityEvent::BecameReachable
        } else {
            warn!("Network became unreachable");
            ConnectivityEvent::BecameUnreachable
        };

        // no subscribers is fine
        let _ = self.inner.events.send(event);
        Some(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.inner.events.subscribe()
    }
}
