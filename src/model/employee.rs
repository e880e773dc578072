use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// Ids at or above this value were issued by the client. Temporary ids are
/// wall-clock milliseconds, so they stay far above anything the remote
/// authority hands out as a serial primary key.
pub const TEMPORARY_ID_FLOOR: i64 = 1_000_000_000_000;

pub fn is_temporary_id(id: i64) -> bool {
    id >= TEMPORARY_ID_FLOOR
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    /// Human-facing personnel code.
    pub business_code: String,
    pub name: String,
    pub position: String,
    pub is_active: bool,
    pub avatar: Option<String>,
}

impl Employee {
    pub fn has_temporary_id(&self) -> bool {
        is_temporary_id(self.id)
    }
}

/// Employee fields as entered by the user, before any id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDraft {
    pub business_code: String,
    pub name: String,
    pub position: String,
    pub is_active: bool,
    pub avatar: Option<String>,
}

impl EmployeeDraft {
    pub fn into_employee(self, id: i64) -> Employee {
        Employee {
            id,
            business_code: self.business_code,
            name: self.name,
            position: self.position,
            is_active: self.is_active,
            avatar: self.avatar,
        }
    }
}

/// Issues temporary employee ids: epoch milliseconds, bumped when two ids are
/// requested within the same millisecond so the sequence is strictly increasing.
#[derive(Debug, Default)]
pub struct TemporaryIds {
    last: AtomicI64,
}

impl TemporaryIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis().max(TEMPORARY_ID_FLOOR);
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}
