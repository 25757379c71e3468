use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use super::JobStore;
use crate::error::StoreError;
use crate::job::{JobPatch, JobRecord};

mock! {
    pub JobStore {}
    #[async_trait]
    impl JobStore for JobStore {
        async fn upsert(&self, patch: JobPatch) -> Result<JobRecord, StoreError>;
        async fn list(&self) -> Result<Vec<JobRecord>, StoreError>;
        async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;
    }
}
