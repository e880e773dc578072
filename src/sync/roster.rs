use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::bounded;
use crate::connectivity::ConnectivityMonitor;
use crate::error::StoreError;
use crate::gateway::RemoteGateway;
use crate::model::attendance::RecordKind;
use crate::model::employee::Employee;
use crate::store::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRecord {
    pub employee_id: i64,
    pub kind: RecordKind,
    pub timestamp: DateTime<Utc>,
    pub source: RecordSource,
}

/// Read side used by display collaborators: remote first when reachable,
/// local store otherwise. Never writes to the outbox.
#[derive(Clone)]
pub struct Roster {
    store: LocalStore,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: ConnectivityMonitor,
    request_timeout: Duration,
}

impl Roster {
    pub fn new(
        store: LocalStore,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: ConnectivityMonitor,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            connectivity,
            request_timeout,
        }
    }

    /// Pulls the server roster into the local store. Employees with pending
    /// local operations keep their local row until those are replayed.
    pub async fn refresh_employees(&self) -> Result<Vec<Employee>, StoreError> {
        if self.connectivity.is_reachable() {
            match bounded(self.request_timeout, self.gateway.list_employees()).await {
                Ok(employees) => {
                    for employee in &employees {
                        if self.store.has_pending_operations(employee.id).await? {
                            debug!(employee_id = employee.id, "Keeping local row with pending changes");
                            continue;
                        }
                        self.store.upsert_employee(employee).await?;
                    }
                    return Ok(employees);
                }
                Err(e) => warn!(error = %e, "Falling back to local employees"),
            }
        }

        self.store.active_employees().await
    }

    pub async fn employee(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        if self.connectivity.is_reachable() && !self.store.has_pending_operations(id).await? {
            match bounded(self.request_timeout, self.gateway.fetch_employee(id)).await {
                Ok(employee) => {
                    self.store.upsert_employee(&employee).await?;
                    return Ok(Some(employee));
                }
                Err(e) => warn!(error = %e, employee_id = id, "Falling back to local employee"),
            }
        }

        self.store.employee(id).await
    }

    pub async fn last_record(&self, employee_id: i64) -> Result<Option<LastRecord>, StoreError> {
        if self.connectivity.is_reachable() {
            match bounded(self.request_timeout, self.gateway.last_record(employee_id)).await {
                Ok(Some(remote)) => {
                    return Ok(Some(LastRecord {
                        employee_id: remote.employee_id,
                        kind: remote.kind,
                        timestamp: remote.timestamp,
                        source: RecordSource::Remote,
                    }));
                }
                Ok(None) => debug!(employee_id, "Remote has no record, checking local store"),
                Err(e) => warn!(error = %e, employee_id, "Falling back to local last record"),
            }
        }

        Ok(self
            .store
            .last_attendance(employee_id)
            .await?
            .map(|record| LastRecord {
                employee_id: record.employee_id,
                kind: record.kind,
                timestamp: record.timestamp,
                source: RecordSource::Local,
            }))
    }
}
