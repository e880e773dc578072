use chrono::{DateTime, Utc};

use super::LocalStore;
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, RecordKind};

impl LocalStore {
    /// `synced = true` is the optimistic mark of an inline push; the caller
    /// rolls it back with [`LocalStore::mark_attendance_unsynced`] on failure.
    pub async fn insert_attendance(
        &self,
        employee_id: i64,
        kind: RecordKind,
        timestamp: DateTime<Utc>,
        synced: bool,
    ) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (employee_id, kind, recorded_at, synced)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(kind.to_string())
        .bind(timestamp.timestamp_millis())
        .bind(synced)
        .execute(&self.pool)
        .await?;

        Ok(AttendanceRecord {
            id: result.last_insert_rowid(),
            employee_id,
            kind,
            timestamp,
            synced,
        })
    }

    /// Flips `synced` to true. Returns false when the record was already synced
    /// or does not exist.
    pub async fn mark_attendance_synced(&self, id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE attendance_records SET synced = 1 WHERE id = ? AND synced = 0")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Rolls back an optimistic mark. Returns false when the record was not
    /// marked synced.
    pub async fn mark_attendance_unsynced(&self, id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE attendance_records SET synced = 0 WHERE id = ? AND synced = 1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn has_unsynced_attendance(&self, employee_id: i64) -> Result<bool, StoreError> {
        let pending = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance_records WHERE employee_id = ? AND synced = 0)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(pending)
    }

    pub async fn unsynced_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, employee_id, kind, recorded_at, synced
            FROM attendance_records
            WHERE synced = 0
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceRecord::try_from)
        .collect()
    }

    pub async fn count_unsynced_attendance(&self) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance_records WHERE synced = 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn last_attendance(
        &self,
        employee_id: i64,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, employee_id, kind, recorded_at, synced
            FROM attendance_records
            WHERE employee_id = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }
}
