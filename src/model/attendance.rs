use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::StoreError;
use crate::model::from_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    CheckIn,
    CheckOut,
}

/// One entry of the append-only attendance ledger.
///
/// `employee_id`, `kind` and `timestamp` never change after insert; `synced`
/// only moves from `false` to `true` once the remote acknowledged the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    pub kind: RecordKind,
    pub timestamp: DateTime<Utc>,
    pub synced: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttendanceRow {
    pub id: i64,
    pub employee_id: i64,
    pub kind: String,
    pub recorded_at: i64,
    pub synced: bool,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(|_| StoreError::Corrupt {
            column: "attendance_records.kind",
            value: row.kind.clone(),
        })?;

        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            kind,
            timestamp: from_millis("attendance_records.recorded_at", row.recorded_at)?,
            synced: row.synced,
        })
    }
}
