use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use super::JobStore;
use crate::error::StoreError;
use crate::job::{JobPatch, JobRecord, MigrationJob};

const COMMAND_BUFFER: usize = 256;

enum Command {
    Upsert {
        patch: JobPatch,
        reply: oneshot::Sender<Result<JobRecord, StoreError>>,
    },
    List {
        reply: oneshot::Sender<Vec<JobRecord>>,
    },
    Get {
        id: Uuid,
        reply: oneshot::Sender<Option<JobRecord>>,
    },
}

/// Job history kept as one JSON array in an object store.
///
/// A single actor task owns the collection and applies commands one at a
/// time, so concurrent jobs never overwrite each other's updates and updates
/// of one job are observed in the order they were issued. Every upsert
/// rewrites the whole collection with a single `put`.
#[derive(Clone)]
pub struct ObjectStoreJobStore {
    tx: mpsc::Sender<Command>,
}

impl ObjectStoreJobStore {
    /// Load the collection at `path` and start the owning actor.
    ///
    /// A missing object is an empty history.
    pub async fn open(object_store: Arc<dyn ObjectStore>, path: Path) -> Result<Self, StoreError> {
        let jobs = load(object_store.as_ref(), &path).await?;
        info!(path = %path, jobs = jobs.len(), "Opened job store");

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = StoreActor {
            object_store,
            path,
            jobs,
        };
        tokio::spawn(actor.run(rx));

        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, StoreError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)
    }
}

#[async_trait]
impl JobStore for ObjectStoreJobStore {
    async fn upsert(&self, patch: JobPatch) -> Result<JobRecord, StoreError> {
        self.request(|reply| Command::Upsert { patch, reply })
            .await?
    }

    async fn list(&self) -> Result<Vec<JobRecord>, StoreError> {
        self.request(|reply| Command::List { reply }).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        self.request(|reply| Command::Get { id, reply }).await
    }
}

async fn load(object_store: &dyn ObjectStore, path: &Path) -> Result<Vec<JobRecord>, StoreError> {
    match object_store.get(path).await {
        Ok(get_result) => {
            let bytes = get_result.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        Err(object_store::Error::NotFound { .. }) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

struct StoreActor {
    object_store: Arc<dyn ObjectStore>,
    path: Path,
    jobs: Vec<JobRecord>,
}

impl StoreActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Upsert { patch, reply } => {
                    let result = self.upsert(patch).await;
                    let _ = reply.send(result);
                }
                Command::List { reply } => {
                    let _ = reply.send(self.jobs.clone());
                }
                Command::Get { id, reply } => {
                    let job = self.jobs.iter().find(|job| job.id == id).cloned();
                    let _ = reply.send(job);
                }
            }
        }
        debug!(path = %self.path, "Job store actor stopped");
    }

    async fn upsert(&mut self, patch: JobPatch) -> Result<JobRecord, StoreError> {
        let index = self.jobs.iter().position(|job| job.id == patch.id);
        let record = match index {
            Some(i) => patch.apply_to(&self.jobs[i])?,
            None => patch.into_record()?,
        };
        MigrationJob::try_from(record.clone())?;

        let previous = match index {
            Some(i) => Some(std::mem::replace(&mut self.jobs[i], record.clone())),
            None => {
                self.jobs.push(record.clone());
                None
            }
        };

        if let Err(e) = self.persist().await {
            // Keep memory in line with what is durably stored.
            match index.zip(previous) {
                Some((i, previous)) => self.jobs[i] = previous,
                None => {
                    self.jobs.pop();
                }
            }
            return Err(e);
        }

        debug!(job_id = %record.id, status = %record.status, progress = record.progress, "Job record persisted");
        Ok(record)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.jobs)?;
        self.object_store.put(&self.path, bytes.into()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use chrono::Utc;
    use object_store::memory::InMemory;
    use object_store::local::LocalFileSystem;

    fn create_patch(id: Uuid, dataset: &str) -> JobPatch {
        JobPatch {
            dataset_name: Some(dataset.to_string()),
            source: Some("aws-s3-vanilla".to_string()),
            destination: Some("cloudflare-r2".to_string()),
            status: Some(JobStatus::Running),
            total_bytes: Some(1000),
            start_time: Some(Utc::now()),
            ..JobPatch::new(id)
        }
    }

    fn progress_patch(id: Uuid, progress: u8, bytes: u64) -> JobPatch {
        JobPatch {
            progress: Some(progress),
            bytes_transferred: Some(bytes),
            ..JobPatch::new(id)
        }
    }

    async fn memory_store() -> (Arc<dyn ObjectStore>, ObjectStoreJobStore) {
        let object_store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let store = ObjectStoreJobStore::open(object_store.clone(), Path::from("migrations.json"))
            .await
            .unwrap();
        (object_store, store)
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let (_, store) = memory_store().await;
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let (_, store) = memory_store().await;
        let id = Uuid::new_v4();

        let created = store.upsert(create_patch(id, "orders")).await.unwrap();
        assert_eq!(created.progress, 0);
        assert_eq!(created.throughput_mbps, 0.0);

        let updated = store.upsert(progress_patch(id, 35, 350)).await.unwrap();
        assert_eq!(updated.progress, 35);
        assert_eq!(updated.dataset_name, "orders");

        assert_eq!(store.get(id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_list_keeps_creation_order() {
        let (_, store) = memory_store().await;
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            store
                .upsert(create_patch(*id, &format!("dataset-{i}")))
                .await
                .unwrap();
        }
        store.upsert(progress_patch(ids[0], 5, 0)).await.unwrap();

        let listed: Vec<Uuid> = store.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_rejected_updates_leave_record_untouched() {
        let (_, store) = memory_store().await;
        let id = Uuid::new_v4();
        store.upsert(create_patch(id, "orders")).await.unwrap();
        store.upsert(progress_patch(id, 35, 350)).await.unwrap();

        let err = store.upsert(progress_patch(id, 5, 350)).await.unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));

        // Completed without all bytes is not a valid record.
        let err = store
            .upsert(JobPatch {
                status: Some(JobStatus::Completed),
                progress: Some(100),
                ..JobPatch::new(id)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));

        let err = store.upsert(progress_patch(Uuid::new_v4(), 5, 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::IncompleteRecord(_)));

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 35);
        assert_eq!(stored.status, JobStatus::Running);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collection_survives_reopen() {
        let (object_store, store) = memory_store().await;
        let id = Uuid::new_v4();
        store.upsert(create_patch(id, "orders")).await.unwrap();
        store.upsert(progress_patch(id, 5, 0)).await.unwrap();
        drop(store);

        let reopened = ObjectStoreJobStore::open(object_store, Path::from("migrations.json"))
            .await
            .unwrap();
        let record = reopened.get(id).await.unwrap().unwrap();
        assert_eq!(record.progress, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_jobs_do_not_lose_updates() {
        let (object_store, store) = memory_store().await;

        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let id = Uuid::new_v4();
                store
                    .upsert(create_patch(id, &format!("dataset-{i}")))
                    .await
                    .unwrap();
                store.upsert(progress_patch(id, 5, 0)).await.unwrap();
                store.upsert(progress_patch(id, 35, 350)).await.unwrap();
                id
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }

        let reopened = ObjectStoreJobStore::open(object_store, Path::from("migrations.json"))
            .await
            .unwrap();
        let records = reopened.list().await.unwrap();
        assert_eq!(records.len(), 32);
        for id in ids {
            let record = reopened.get(id).await.unwrap().unwrap();
            assert_eq!(record.progress, 35);
            assert_eq!(record.bytes_transferred, 350);
        }
    }

    #[tokio::test]
    async fn test_collection_is_a_json_array_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let object_store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(dir.path()).unwrap());
        let store = ObjectStoreJobStore::open(object_store, Path::from("migrations.json"))
            .await
            .unwrap();

        let id = Uuid::new_v4();
        store.upsert(create_patch(id, "orders")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("migrations.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], id.to_string());
        assert_eq!(entries[0]["status"], "running");
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let object_store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(dir.path()).unwrap());
        let store = ObjectStoreJobStore::open(object_store, Path::from("jobs/migrations.json"))
            .await
            .unwrap();

        // A plain file where the parent directory should be makes every write fail.
        std::fs::write(dir.path().join("jobs"), b"in the way").unwrap();

        let id = Uuid::new_v4();
        let err = store.upsert(create_patch(id, "orders")).await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectStore(_)));
        assert!(store.list().await.unwrap().is_empty());

        std::fs::remove_file(dir.path().join("jobs")).unwrap();
        store.upsert(create_patch(id, "orders")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
