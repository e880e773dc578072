use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::StoreError;
use crate::model::employee::Employee;
use crate::model::from_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OpType {
    Create,
    Update,
    Delete,
}

/// Outbox entry: one per mutating employee action.
///
/// `snapshot` is the employee as it looked when the action happened and is what
/// gets replayed; `employee_id` is the local id at enqueue time, rewritten when
/// a temporary id is remapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeOperation {
    pub id: i64,
    pub op_type: OpType,
    pub employee_id: i64,
    pub snapshot: Employee,
    pub timestamp: DateTime<Utc>,
    pub synced: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OperationRow {
    pub id: i64,
    pub op_type: String,
    pub employee_id: i64,
    pub snapshot: String,
    pub recorded_at: i64,
    pub synced: bool,
}

impl TryFrom<OperationRow> for EmployeeOperation {
    type Error = StoreError;

    fn try_from(row: OperationRow) -> Result<Self, Self::Error> {
        let op_type = row.op_type.parse().map_err(|_| StoreError::Corrupt {
            column: "employee_operations.op_type",
            value: row.op_type.clone(),
        })?;

        Ok(Self {
            id: row.id,
            op_type,
            employee_id: row.employee_id,
            snapshot: serde_json::from_str(&row.snapshot)?,
            timestamp: from_millis("employee_operations.recorded_at", row.recorded_at)?,
            synced: row.synced,
        })
    }
}
