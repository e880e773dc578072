//! Durable local tables: attendance records, employees and the employee
//! operation outbox. Every write returns only after sqlite committed it.

mod attendance;
mod employee;
mod operation;

use sqlx::SqlitePool;

use crate::db::init_db;
use crate::error::StoreError;

/// Handle to the local database. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(database_url).await?))
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> LocalStore {
    LocalStore::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}
