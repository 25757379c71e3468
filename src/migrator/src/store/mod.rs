#[cfg(test)]
mod mock;
mod object;

#[cfg(test)]
pub use mock::MockJobStore;
pub use object::ObjectStoreJobStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::job::{JobPatch, JobRecord};

/// Durable job history keyed by job id. Records are never deleted.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Merge `patch` into the record with the same id, creating it if absent.
    ///
    /// Returns the record as persisted.
    async fn upsert(&self, patch: JobPatch) -> Result<JobRecord, StoreError>;

    /// All records in creation order.
    async fn list(&self) -> Result<Vec<JobRecord>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;
}
