//! Offline-first synchronization: immediate push on write, outbox replay,
//! identifier remapping and outbox garbage collection.

mod coordinator;
mod gc;
mod remap;
mod roster;
mod scheduler;

pub use coordinator::SyncCoordinator;
pub use gc::OutboxCollector;
pub use remap::{IdentifierRemapper, RemapOutcome};
pub use roster::{LastRecord, RecordSource, Roster};
pub use scheduler::{Scheduler, SchedulerConfig};

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::GatewayError;
use crate::model::attendance::{AttendanceRecord, RecordKind};
use crate::model::employee::Employee;
use crate::model::operation::OpType;

/// Default bound on a single remote request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to the inline push attempted together with a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote acknowledged the write.
    Synced,
    /// Not reachable; the write waits for the next replay pass.
    Offline,
    /// Reachable, but the push did not go through. The write waits for the
    /// next replay pass; `reason` is an advisory note for the user.
    Deferred { reason: String },
}

impl PushOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, PushOutcome::Synced)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceOutcome {
    pub record: AttendanceRecord,
    pub push: PushOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeOutcome {
    /// The employee after the action; its id is the server id when a create
    /// went through inline.
    pub employee: Employee,
    pub operation_id: i64,
    pub push: PushOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub attendance_synced: usize,
    pub attendance_failed: usize,
    pub operations_synced: usize,
    pub operations_failed: usize,
}

impl ReplayReport {
    pub fn synced_count(&self) -> usize {
        self.attendance_synced + self.operations_synced
    }

    pub fn failed_count(&self) -> usize {
        self.attendance_failed + self.operations_failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    Completed(ReplayReport),
    /// Another pass was in flight; this trigger did nothing.
    AlreadyRunning,
    Offline,
    /// The network is up but the liveness probe got no answer.
    RemoteUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    AttendanceRecorded {
        record_id: i64,
        employee_id: i64,
        kind: RecordKind,
        timestamp: DateTime<Utc>,
    },
    AttendanceSynced {
        record_id: i64,
    },
    OperationSynced {
        operation_id: i64,
        op_type: OpType,
        employee_id: i64,
    },
    EmployeeRemapped {
        temporary_id: i64,
        real_id: i64,
    },
    ReplayFinished(ReplayReport),
}

/// Runs a remote call under `timeout`; an expired call is dropped and
/// reported as [`GatewayError::Timeout`].
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(GatewayError::Timeout))
}
