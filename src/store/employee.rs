use super::LocalStore;
use crate::error::StoreError;
use crate::model::employee::Employee;

impl LocalStore {
    pub async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, business_code, name, position, is_active, avatar)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee.id)
        .bind(&employee.business_code)
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.is_active)
        .bind(&employee.avatar)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns false when no row with this id exists.
    pub async fn update_employee(&self, employee: &Employee) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET business_code = ?, name = ?, position = ?, is_active = ?, avatar = ?
            WHERE id = ?
            "#,
        )
        .bind(&employee.business_code)
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.is_active)
        .bind(&employee.avatar)
        .bind(employee.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn upsert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, business_code, name, position, is_active, avatar)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                business_code = excluded.business_code,
                name = excluded.name,
                position = excluded.position,
                is_active = excluded.is_active,
                avatar = excluded.avatar
            "#,
        )
        .bind(employee.id)
        .bind(&employee.business_code)
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.is_active)
        .bind(&employee.avatar)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_employee(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn employee(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, business_code, name, position, is_active, avatar FROM employees WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn active_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, business_code, name, position, is_active, avatar
            FROM employees
            WHERE is_active = 1
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }

    pub async fn all_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT id, business_code, name, position, is_active, avatar FROM employees ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }

    /// Server id a temporary id was remapped to, if the create went through.
    pub async fn real_employee_id(&self, temporary_id: i64) -> Result<Option<i64>, StoreError> {
        let real_id = sqlx::query_scalar::<_, i64>(
            "SELECT real_id FROM employee_id_remaps WHERE temporary_id = ?",
        )
        .bind(temporary_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(real_id)
    }
}
