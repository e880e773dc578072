use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::LocalStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    /// False when the local row was already gone.
    pub employee_moved: bool,
    pub operations_retargeted: u64,
}

/// Rewrites a temporary employee id to the id the server assigned, across the
/// employee table and every outbox entry, in one transaction. The pair is
/// kept in `employee_id_remaps` so attendance recorded against the temporary
/// id can still be delivered.
#[derive(Clone, Debug)]
pub struct IdentifierRemapper {
    store: LocalStore,
}

impl IdentifierRemapper {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub async fn remap(&self, temporary_id: i64, real_id: i64) -> Result<RemapOutcome, StoreError> {
        self.apply(None, temporary_id, real_id).await
    }

    /// Marks the create operation synced and remaps in the same transaction,
    /// so a later pass can never see the create acknowledged while dependent
    /// operations still point at the temporary id.
    pub async fn complete_create(
        &self,
        operation_id: i64,
        temporary_id: i64,
        real_id: i64,
    ) -> Result<RemapOutcome, StoreError> {
        self.apply(Some(operation_id), temporary_id, real_id).await
    }

    async fn apply(
        &self,
        operation_id: Option<i64>,
        temporary_id: i64,
        real_id: i64,
    ) -> Result<RemapOutcome, StoreError> {
        let mut tx = self.store.pool().begin().await?;

        if let Some(operation_id) = operation_id {
            sqlx::query("UPDATE employee_operations SET synced = 1 WHERE id = ?")
                .bind(operation_id)
                .execute(&mut *tx)
                .await?;
        }

        if temporary_id == real_id {
            tx.commit().await?;
            return Ok(RemapOutcome::default());
        }

        sqlx::query(
            "INSERT OR REPLACE INTO employee_id_remaps (temporary_id, real_id) VALUES (?, ?)",
        )
        .bind(temporary_id)
        .bind(real_id)
        .execute(&mut *tx)
        .await?;

        let temporary_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)",
        )
        .bind(temporary_id)
        .fetch_one(&mut *tx)
        .await?;

        let employee_moved = if temporary_exists {
            // a roster refresh may already have pulled the server row; the
            // local row carries newer edits and wins
            sqlx::query("DELETE FROM employees WHERE id = ?")
                .bind(real_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE employees SET id = ? WHERE id = ?")
                .bind(real_id)
                .bind(temporary_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                == 1
        } else {
            debug!(temporary_id, real_id, "No local row left to remap");
            false
        };

        let operations_retargeted =
            sqlx::query("UPDATE employee_operations SET employee_id = ? WHERE employee_id = ?")
                .bind(real_id)
                .bind(temporary_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        tx.commit().await?;

        info!(
            temporary_id,
            real_id, employee_moved, operations_retargeted, "Remapped employee id"
        );

        Ok(RemapOutcome {
            employee_moved,
            operations_retargeted,
        })
    }
}
