//! Remote authority seam. The sync engine only talks to the server through
//! [`RemoteGateway`], which keeps it testable without a network.

mod http;
pub mod wire;

pub use http::HttpGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GatewayError;
use crate::model::attendance::RecordKind;
use crate::model::employee::Employee;

/// Attendance record as the remote authority stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttendance {
    pub id: i64,
    pub employee_id: i64,
    pub kind: RecordKind,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// `GET /employees`
    async fn list_employees(&self) -> Result<Vec<Employee>, GatewayError>;

    /// `GET /employees/{id}`
    async fn fetch_employee(&self, id: i64) -> Result<Employee, GatewayError>;

    /// `POST /employees`; the returned employee carries the server id.
    async fn create_employee(&self, employee: &Employee) -> Result<Employee, GatewayError>;

    /// `PUT /employees/{id}`
    async fn update_employee(&self, id: i64, employee: &Employee)
    -> Result<Employee, GatewayError>;

    /// `DELETE /employees/{id}`
    async fn delete_employee(&self, id: i64) -> Result<(), GatewayError>;

    /// `POST /attendance`
    async fn record_attendance(
        &self,
        employee_id: i64,
        kind: RecordKind,
    ) -> Result<(), GatewayError>;

    /// `GET /employees/{id}/last-record`
    async fn last_record(&self, employee_id: i64)
    -> Result<Option<RemoteAttendance>, GatewayError>;

    /// Liveness probe: true only when the server itself answered.
    async fn probe(&self) -> bool;
}
