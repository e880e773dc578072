use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use super::remap::IdentifierRemapper;
use super::roster::Roster;
use super::{
    AttendanceOutcome, DEFAULT_REQUEST_TIMEOUT, EmployeeOutcome, PushOutcome, ReplayReport,
    ReplayStatus, SyncEvent, bounded,
};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{GatewayError, StoreError, SyncError};
use crate::gateway::RemoteGateway;
use crate::model::attendance::{AttendanceRecord, RecordKind};
use crate::model::employee::{Employee, EmployeeDraft, TemporaryIds, is_temporary_id};
use crate::model::now_millis;
use crate::model::operation::{EmployeeOperation, OpType};
use crate::store::LocalStore;

/// Decides when to write locally, when to push, and replays whatever has not
/// reached the remote authority yet.
///
/// Every user action is written to the [`LocalStore`] first. Attendance
/// records are pushed on their own; employee mutations always go through the
/// outbox so it stays the single record of what the server still has to see.
pub struct SyncCoordinator {
    store: LocalStore,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: ConnectivityMonitor,
    remapper: IdentifierRemapper,
    temporary_ids: TemporaryIds,
    request_timeout: Duration,
    replaying: AtomicBool,
    /// Outbox entries a push is currently working on.
    in_flight: Mutex<HashSet<i64>>,
    events: broadcast::Sender<SyncEvent>,
}

/// Holds the replay flag for the lifetime of one pass.
struct ReplayGuard<'a>(&'a AtomicBool);

impl<'a> ReplayGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Exclusive hold on one outbox entry while it is pushed.
struct OperationClaim<'a> {
    held: &'a Mutex<HashSet<i64>>,
    operation_id: i64,
}

impl<'a> OperationClaim<'a> {
    fn acquire(held: &'a Mutex<HashSet<i64>>, operation_id: i64) -> Option<Self> {
        let inserted = held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation_id);
        // built only on success: dropping a claim releases the id
        inserted.then(|| Self { held, operation_id })
    }
}

impl Drop for OperationClaim<'_> {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.operation_id);
    }
}

enum Pushed {
    Acknowledged,
    Failed(String),
}

impl SyncCoordinator {
    pub fn new(
        store: LocalStore,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            remapper: IdentifierRemapper::new(store.clone()),
            store,
            gateway,
            connectivity,
            temporary_ids: TemporaryIds::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            replaying: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Read-through view of the roster sharing this coordinator's collaborators.
    pub fn roster(&self) -> Roster {
        Roster::new(
            self.store.clone(),
            Arc::clone(&self.gateway),
            self.connectivity.clone(),
            self.request_timeout,
        )
    }

    /// Observers for presentation collaborators.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::Acquire)
    }

    /// Asks the server itself whether it is answering.
    pub async fn probe_remote(&self) -> bool {
        tokio::time::timeout(self.request_timeout, self.gateway.probe())
            .await
            .unwrap_or(false)
    }

    /// Unsynced attendance records and unsynced outbox entries.
    pub async fn pending(&self) -> Result<(i64, i64), StoreError> {
        Ok((
            self.store.count_unsynced_attendance().await?,
            self.store.count_unsynced_operations().await?,
        ))
    }

    // ---------- user actions ----------

    /// Writes the record locally and, when reachable, pushes it inline.
    ///
    /// A pushed record is written already marked synced, so a replay pass
    /// running at the same time never sends it a second time. A failed push
    /// rolls the mark back.
    #[instrument(skip(self))]
    pub async fn record_attendance(
        &self,
        employee_id: i64,
        kind: RecordKind,
    ) -> Result<AttendanceOutcome, SyncError> {
        let reachable = self.connectivity.is_reachable();
        // never overtake records of this employee still waiting for replay
        let queued_before = reachable && self.store.has_unsynced_attendance(employee_id).await?;
        let push_now = reachable && !queued_before;

        let mut record = self
            .store
            .insert_attendance(employee_id, kind, now_millis(), push_now)
            .await?;

        self.notify(SyncEvent::AttendanceRecorded {
            record_id: record.id,
            employee_id,
            kind,
            timestamp: record.timestamp,
        });

        if !reachable {
            info!(record_id = record.id, "Offline, attendance queued for replay");
            return Ok(AttendanceOutcome {
                record,
                push: PushOutcome::Offline,
            });
        }

        if queued_before {
            info!(record_id = record.id, "Earlier records pending, attendance queued behind them");
            return Ok(AttendanceOutcome {
                record,
                push: PushOutcome::Deferred {
                    reason: "earlier records of this employee are still pending".to_string(),
                },
            });
        }

        let push = match self.send_attendance(&record).await? {
            Pushed::Acknowledged => {
                self.notify(SyncEvent::AttendanceSynced {
                    record_id: record.id,
                });
                PushOutcome::Synced
            }
            Pushed::Failed(reason) => {
                self.store.mark_attendance_unsynced(record.id).await?;
                record.synced = false;
                PushOutcome::Deferred { reason }
            }
        };

        Ok(AttendanceOutcome { record, push })
    }

    #[instrument(skip(self, draft), fields(business_code = %draft.business_code))]
    pub async fn create_employee(&self, draft: EmployeeDraft) -> Result<EmployeeOutcome, SyncError> {
        let employee = draft.into_employee(self.temporary_ids.next());
        self.store.insert_employee(&employee).await?;

        let operation = self
            .store
            .append_operation(OpType::Create, &employee, now_millis())
            .await?;

        self.finish_mutation(operation).await
    }

    #[instrument(skip(self, employee), fields(employee_id = employee.id))]
    pub async fn update_employee(&self, employee: Employee) -> Result<EmployeeOutcome, SyncError> {
        if !self.store.update_employee(&employee).await? {
            return Err(SyncError::EmployeeNotFound(employee.id));
        }

        let operation = self
            .store
            .append_operation(OpType::Update, &employee, now_millis())
            .await?;

        self.finish_mutation(operation).await
    }

    pub async fn set_avatar(
        &self,
        employee_id: i64,
        avatar: Option<String>,
    ) -> Result<EmployeeOutcome, SyncError> {
        let mut employee = self
            .store
            .employee(employee_id)
            .await?
            .ok_or(SyncError::EmployeeNotFound(employee_id))?;
        employee.avatar = avatar;

        self.update_employee(employee).await
    }

    #[instrument(skip(self))]
    pub async fn delete_employee(&self, employee_id: i64) -> Result<EmployeeOutcome, SyncError> {
        let employee = self
            .store
            .employee(employee_id)
            .await?
            .ok_or(SyncError::EmployeeNotFound(employee_id))?;

        self.store.delete_employee(employee_id).await?;

        let operation = self
            .store
            .append_operation(OpType::Delete, &employee, now_millis())
            .await?;

        self.finish_mutation(operation).await
    }

    /// The outbox entry already exists; push it inline when the network is up.
    async fn finish_mutation(
        &self,
        operation: EmployeeOperation,
    ) -> Result<EmployeeOutcome, SyncError> {
        let operation_id = operation.id;

        if !self.connectivity.is_reachable() {
            info!(operation_id, op_type = %operation.op_type, "Offline, operation queued for replay");
            return Ok(EmployeeOutcome {
                employee: operation.snapshot,
                operation_id,
                push: PushOutcome::Offline,
            });
        }

        let push = match OperationClaim::acquire(&self.in_flight, operation_id) {
            None => {
                debug!(operation_id, "Operation already picked up by a replay pass");
                PushOutcome::Deferred {
                    reason: "already being replayed".to_string(),
                }
            }
            Some(_claim) => {
                if self
                    .store
                    .has_earlier_pending_operations(operation.employee_id, operation_id)
                    .await?
                {
                    info!(
                        operation_id,
                        employee_id = operation.employee_id,
                        "Earlier changes pending, operation queued behind them"
                    );
                    PushOutcome::Deferred {
                        reason: "earlier changes to this employee are still pending".to_string(),
                    }
                } else {
                    match self.push_operation(&operation).await? {
                        Pushed::Acknowledged => PushOutcome::Synced,
                        Pushed::Failed(reason) => PushOutcome::Deferred { reason },
                    }
                }
            }
        };

        // a successful create moved the row to its server id
        let employee = match self.store.operation(operation_id).await? {
            Some(stored) => Employee {
                id: stored.employee_id,
                ..operation.snapshot
            },
            None => operation.snapshot,
        };

        Ok(EmployeeOutcome {
            employee,
            operation_id,
            push,
        })
    }

    // ---------- replay ----------

    /// One replay pass over every unsynced operation and attendance record.
    ///
    /// A trigger that arrives while a pass is in flight is a no-op. Failed
    /// entries stay unsynced and do not stop the pass, but the remaining
    /// entries of the same employee wait for the next pass so they never
    /// reach the server out of order.
    pub async fn replay(&self) -> Result<ReplayStatus, SyncError> {
        let Some(_guard) = ReplayGuard::acquire(&self.replaying) else {
            debug!("Replay already running, trigger ignored");
            return Ok(ReplayStatus::AlreadyRunning);
        };

        if !self.connectivity.is_reachable() {
            debug!("Offline, replay skipped");
            return Ok(ReplayStatus::Offline);
        }

        let operations = self.store.unsynced_operations().await?;
        let records = self.store.unsynced_attendance().await?;

        if operations.is_empty() && records.is_empty() {
            return Ok(ReplayStatus::Completed(ReplayReport::default()));
        }

        if !self.probe_remote().await {
            warn!(
                operations = operations.len(),
                records = records.len(),
                "Remote not answering, replay postponed"
            );
            return Ok(ReplayStatus::RemoteUnavailable);
        }

        info!(
            operations = operations.len(),
            records = records.len(),
            "Replay started"
        );

        let mut report = ReplayReport::default();
        let mut held_employees = HashSet::new();

        for queued in operations {
            let Some(_claim) = OperationClaim::acquire(&self.in_flight, queued.id) else {
                debug!(operation_id = queued.id, "Operation is being pushed inline");
                held_employees.insert(queued.employee_id);
                continue;
            };

            // re-read: a create earlier in this pass may have retargeted it
            let Some(operation) = self.store.operation(queued.id).await? else {
                continue;
            };
            if operation.synced {
                continue;
            }

            if held_employees.contains(&operation.employee_id) {
                debug!(
                    operation_id = operation.id,
                    employee_id = operation.employee_id,
                    "Earlier change of this employee failed, operation waits"
                );
                report.operations_failed += 1;
                continue;
            }

            match self.push_operation(&operation).await? {
                Pushed::Acknowledged => report.operations_synced += 1,
                Pushed::Failed(_) => {
                    report.operations_failed += 1;
                    held_employees.insert(operation.employee_id);
                }
            }
        }

        let mut held_attendance = HashSet::new();

        for record in records {
            if held_attendance.contains(&record.employee_id) {
                report.attendance_failed += 1;
                continue;
            }

            match self.send_attendance(&record).await? {
                Pushed::Acknowledged => {
                    self.store.mark_attendance_synced(record.id).await?;
                    self.notify(SyncEvent::AttendanceSynced {
                        record_id: record.id,
                    });
                    report.attendance_synced += 1;
                }
                Pushed::Failed(_) => {
                    report.attendance_failed += 1;
                    held_attendance.insert(record.employee_id);
                }
            }
        }

        info!(
            synced = report.synced_count(),
            failed = report.failed_count(),
            "Replay finished"
        );
        self.notify(SyncEvent::ReplayFinished(report));

        Ok(ReplayStatus::Completed(report))
    }

    // ---------- pushes ----------

    /// Sends one record. Leaves the stored `synced` flag to the caller.
    async fn send_attendance(&self, record: &AttendanceRecord) -> Result<Pushed, StoreError> {
        let employee_id = if is_temporary_id(record.employee_id) {
            // the record stays as written; only the request uses the server id
            match self.store.real_employee_id(record.employee_id).await? {
                Some(real_id) => real_id,
                None => {
                    debug!(
                        record_id = record.id,
                        employee_id = record.employee_id,
                        "Attendance references an employee the remote does not know"
                    );
                    return Ok(Pushed::Failed(
                        "employee not yet known to the server".to_string(),
                    ));
                }
            }
        } else {
            record.employee_id
        };

        let result = bounded(
            self.request_timeout,
            self.gateway.record_attendance(employee_id, record.kind),
        )
        .await;

        match result {
            Ok(()) => Ok(Pushed::Acknowledged),
            Err(e) => {
                warn!(error = %e, record_id = record.id, employee_id, "Attendance push failed, record stays unsynced");
                Ok(Pushed::Failed(e.to_string()))
            }
        }
    }

    async fn push_operation(&self, operation: &EmployeeOperation) -> Result<Pushed, StoreError> {
        let target = operation.employee_id;

        if operation.op_type != OpType::Create && is_temporary_id(target) {
            debug!(
                operation_id = operation.id,
                employee_id = target,
                "Waiting for the create of this employee"
            );
            return Ok(Pushed::Failed(
                "employee not yet created on the server".to_string(),
            ));
        }

        let result = match operation.op_type {
            OpType::Create => bounded(
                self.request_timeout,
                self.gateway.create_employee(&operation.snapshot),
            )
            .await
            .map(|created| Some(created.id)),
            OpType::Update => bounded(
                self.request_timeout,
                self.gateway.update_employee(target, &operation.snapshot),
            )
            .await
            .map(|_| None),
            OpType::Delete => {
                match bounded(self.request_timeout, self.gateway.delete_employee(target)).await {
                    // already gone on the server is what a delete wants
                    Err(GatewayError::Status(404)) => Ok(None),
                    other => other.map(|_| None),
                }
            }
        };

        let real_id = match result {
            Ok(real_id) => real_id,
            Err(e) => {
                warn!(
                    error = %e,
                    operation_id = operation.id,
                    op_type = %operation.op_type,
                    employee_id = target,
                    "Operation push failed, entry stays unsynced"
                );
                return Ok(Pushed::Failed(e.to_string()));
            }
        };

        let synced_target = match real_id {
            Some(real_id) => {
                self.remapper
                    .complete_create(operation.id, target, real_id)
                    .await
                    .inspect_err(|e| {
                        error!(error = %e, operation_id = operation.id, "Failed to record acknowledged create");
                    })?;
                if real_id != target {
                    self.notify(SyncEvent::EmployeeRemapped {
                        temporary_id: target,
                        real_id,
                    });
                }
                real_id
            }
            None => {
                self.store.mark_operation_synced(operation.id).await?;
                target
            }
        };

        self.notify(SyncEvent::OperationSynced {
            operation_id: operation.id,
            op_type: operation.op_type,
            employee_id: synced_target,
        });

        Ok(Pushed::Acknowledged)
    }
}
