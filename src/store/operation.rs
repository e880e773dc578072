use chrono::{DateTime, Utc};

use super::LocalStore;
use crate::error::StoreError;
use crate::model::employee::Employee;
use crate::model::operation::{EmployeeOperation, OpType, OperationRow};

impl LocalStore {
    /// Appends an outbox entry targeting `snapshot.id`.
    pub async fn append_operation(
        &self,
        op_type: OpType,
        snapshot: &Employee,
        timestamp: DateTime<Utc>,
    ) -> Result<EmployeeOperation, StoreError> {
        let encoded = serde_json::to_string(snapshot)?;

        let result = sqlx::query(
            r#"
            INSERT INTO employee_operations (op_type, employee_id, snapshot, recorded_at, synced)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(op_type.to_string())
        .bind(snapshot.id)
        .bind(encoded)
        .bind(timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(EmployeeOperation {
            id: result.last_insert_rowid(),
            op_type,
            employee_id: snapshot.id,
            snapshot: snapshot.clone(),
            timestamp,
            synced: false,
        })
    }

    pub async fn operation(&self, id: i64) -> Result<Option<EmployeeOperation>, StoreError> {
        sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT id, op_type, employee_id, snapshot, recorded_at, synced
            FROM employee_operations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(EmployeeOperation::try_from)
        .transpose()
    }

    pub async fn mark_operation_synced(&self, id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE employee_operations SET synced = 1 WHERE id = ? AND synced = 0")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn unsynced_operations(&self) -> Result<Vec<EmployeeOperation>, StoreError> {
        sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT id, op_type, employee_id, snapshot, recorded_at, synced
            FROM employee_operations
            WHERE synced = 0
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(EmployeeOperation::try_from)
        .collect()
    }

    pub async fn count_unsynced_operations(&self) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee_operations WHERE synced = 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn has_pending_operations(&self, employee_id: i64) -> Result<bool, StoreError> {
        let pending = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employee_operations WHERE employee_id = ? AND synced = 0)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(pending)
    }

    /// Whether an entry appended before `operation_id` for the same employee
    /// is still waiting to reach the server.
    pub async fn has_earlier_pending_operations(
        &self,
        employee_id: i64,
        operation_id: i64,
    ) -> Result<bool, StoreError> {
        let pending = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM employee_operations
                WHERE employee_id = ? AND synced = 0 AND id < ?
            )
            "#,
        )
        .bind(employee_id)
        .bind(operation_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(pending)
    }

    /// Deletes synced entries recorded strictly before `cutoff`. Unsynced
    /// entries are never touched.
    pub async fn delete_synced_operations_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM employee_operations WHERE synced = 1 AND recorded_at < ?")
                .bind(cutoff.timestamp_millis())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
