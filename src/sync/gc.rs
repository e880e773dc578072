use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::StoreError;
use crate::store::LocalStore;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Prunes synced outbox entries older than the retention window. Unsynced
/// entries are retried forever and never collected.
#[derive(Clone, Debug)]
pub struct OutboxCollector {
    store: LocalStore,
    retention: Duration,
}

impl OutboxCollector {
    pub fn new(store: LocalStore, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn with_default_retention(store: LocalStore) -> Self {
        Self::new(store, Duration::days(DEFAULT_RETENTION_DAYS))
    }

    pub async fn collect(&self) -> Result<u64, StoreError> {
        self.collect_at(Utc::now()).await
    }

    pub async fn collect_at(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = now - self.retention;
        let removed = self.store.delete_synced_operations_before(cutoff).await?;
        if removed > 0 {
            info!(removed, %cutoff, "Collected synced outbox entries");
        }
        Ok(removed)
    }
}
