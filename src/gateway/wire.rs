//! Wire schema of the remote authority. Field names follow the server's
//! snake_case convention; the personnel code travels as `employee_id`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::RemoteAttendance;
use crate::model::attendance::RecordKind;
use crate::model::employee::Employee;

pub const CHECK_IN: &str = "ورود";
pub const CHECK_OUT: &str = "خروج";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEmployee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub employee_id: String,
    pub position: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar: Option<String>,
}

fn active_by_default() -> bool {
    true
}

impl WireEmployee {
    /// Request body: the server owns the id, so it never travels in a body.
    pub fn body(employee: &Employee) -> Self {
        Self {
            id: None,
            name: employee.name.clone(),
            employee_id: employee.business_code.clone(),
            position: employee.position.clone(),
            is_active: employee.is_active,
            avatar: employee.avatar.clone(),
        }
    }
}

impl TryFrom<WireEmployee> for Employee {
    type Error = GatewayError;

    fn try_from(wire: WireEmployee) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .ok_or_else(|| GatewayError::Malformed("employee without id".to_string()))?;

        Ok(Employee {
            id,
            business_code: wire.employee_id,
            name: wire.name,
            position: wire.position,
            is_active: wire.is_active,
            avatar: wire.avatar,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct WireAttendanceRequest {
    pub employee_id: i64,
    pub record_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct WireAttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    pub record_type: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct WireLastRecordResponse {
    #[serde(default)]
    pub message: String,
    pub last_record: Option<WireAttendanceRecord>,
}

pub fn record_type(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::CheckIn => CHECK_IN,
        RecordKind::CheckOut => CHECK_OUT,
    }
}

pub fn parse_record_type(value: &str) -> Option<RecordKind> {
    match value {
        CHECK_IN => Some(RecordKind::CheckIn),
        CHECK_OUT => Some(RecordKind::CheckOut),
        other => other.parse().ok(),
    }
}

/// The server emits naive timestamps; those are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, GatewayError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| GatewayError::Malformed(format!("timestamp {value:?}: {e}")))
}

impl TryFrom<WireAttendanceRecord> for RemoteAttendance {
    type Error = GatewayError;

    fn try_from(wire: WireAttendanceRecord) -> Result<Self, Self::Error> {
        let kind = parse_record_type(&wire.record_type).ok_or_else(|| {
            GatewayError::Malformed(format!("record_type {:?}", wire.record_type))
        })?;

        Ok(Self {
            id: wire.id,
            employee_id: wire.employee_id,
            kind,
            timestamp: parse_timestamp(&wire.timestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_employee_maps_to_local_naming() {
        let wire: WireEmployee = serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Sara",
            "employee_id": "P-0042",
            "position": "Nurse",
            "is_active": false
        }))
        .unwrap();

        let employee = Employee::try_from(wire).unwrap();
        assert_eq!(employee.id, 4);
        assert_eq!(employee.business_code, "P-0042");
        assert!(!employee.is_active);
        assert_eq!(employee.avatar, None);
    }

    #[test]
    fn request_body_omits_local_id() {
        let employee = Employee {
            id: 1_700_000_000_000,
            business_code: "P-7".to_string(),
            name: "Reza".to_string(),
            position: "Driver".to_string(),
            is_active: true,
            avatar: None,
        };

        let body = serde_json::to_value(WireEmployee::body(&employee)).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["employee_id"], "P-7");
        assert_eq!(body["is_active"], true);
    }

    #[test]
    fn employee_without_id_is_malformed() {
        let wire: WireEmployee = serde_json::from_value(serde_json::json!({
            "name": "Sara",
            "employee_id": "P-0042",
            "position": "Nurse"
        }))
        .unwrap();

        assert!(matches!(
            Employee::try_from(wire),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn naive_server_timestamp_is_accepted() {
        let parsed = parse_timestamp("2024-03-01T08:15:30.250000").unwrap();
        assert_eq!(parsed.timestamp_millis() % 1000, 250);
        assert!(parse_timestamp("2024-03-01T08:15:30Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn record_types_follow_server_vocabulary() {
        assert_eq!(record_type(RecordKind::CheckIn), CHECK_IN);
        assert_eq!(parse_record_type(CHECK_OUT), Some(RecordKind::CheckOut));
        assert_eq!(parse_record_type("check_in"), Some(RecordKind::CheckIn));
        assert_eq!(parse_record_type("lunch"), None);
    }
}
