//! Drives migration jobs from `running` to a terminal state.
//!
//! Every job passes through the same persisted checkpoints:
//!
//! 1. created at progress 0
//! 2. progress 5, then the departure delay at the source
//! 3. progress 35 with 35% of the bytes, then the arrival delay at the
//!    destination and the cleanup delay
//! 4. completed at progress 100 with both throughput figures
//!
//! A failure after creation is persisted as a `failed` record that keeps the
//! last checkpointed progress.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use common::config::Configuration;
use common::storage::create_job_object_store;
use common::{DatasetMetadata, StorageCatalog, StorageOption};
use object_store::path::Path;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{MigrationError, Result, StoreError, TransferError};
use crate::job::{JobPatch, JobState, MigrationJob};
use crate::store::{JobStore, ObjectStoreJobStore};
use crate::transfer::{SimulatedTransfer, Transfer};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

const DEPARTURE_PROGRESS: u8 = 5;
const BULK_PROGRESS: u8 = 35;
const BULK_FRACTION: f64 = 0.35;

/// A started migration. Dropping the handle does not stop the job.
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    task: JoinHandle<MigrationJob>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the job to reach a terminal state.
    pub async fn wait(self) -> Result<MigrationJob> {
        Ok(self.task.await?)
    }
}

#[derive(Clone)]
pub struct MigrationOrchestrator {
    catalog: Arc<StorageCatalog>,
    store: Arc<dyn JobStore>,
    transfer: Arc<dyn Transfer>,
    cleanup_delay: Duration,
}

impl MigrationOrchestrator {
    pub fn new(
        catalog: Arc<StorageCatalog>,
        store: Arc<dyn JobStore>,
        transfer: Arc<dyn Transfer>,
        cleanup_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            transfer,
            cleanup_delay,
        }
    }

    /// Orchestrator with the configured job store and simulated transfers.
    pub async fn from_config(
        catalog: Arc<StorageCatalog>,
        config: &Configuration,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let object_store = create_job_object_store(&config.job_store)?;
        let store = ObjectStoreJobStore::open(object_store, Path::from(config.job_store.path.as_str()))
            .await
            .with_context(|| format!("Failed to open job store at {}", config.job_store.dsn))?;

        Ok(Self::new(
            catalog,
            Arc::new(store),
            Arc::new(SimulatedTransfer::new(config.migration.latency_scale)),
            config.migration.cleanup_delay,
        ))
    }

    pub fn catalog(&self) -> &Arc<StorageCatalog> {
        &self.catalog
    }

    /// Validate the request, persist the initial `running` record and spawn the job.
    #[tracing::instrument(skip(self, dataset), fields(dataset = %dataset.name))]
    pub async fn start_migration(
        &self,
        dataset: &DatasetMetadata,
        source: &str,
        destination: &str,
    ) -> Result<JobHandle> {
        dataset.validate(&self.catalog)?;
        let source = self.resolve(source)?;
        let destination = self.resolve(destination)?;

        let job = MigrationJob {
            id: Uuid::new_v4(),
            dataset_name: dataset.name.clone(),
            dataset: Some(dataset.clone()),
            source: source.id.clone(),
            destination: destination.id.clone(),
            // Validation caps size_gb, so the byte count fits.
            total_bytes: (dataset.size_gb * BYTES_PER_GIB).round() as u64,
            start_time: Utc::now(),
            notes: None,
            state: JobState::Running {
                progress: 0,
                bytes_transferred: 0,
            },
        };
        let started = Instant::now();

        self.store.upsert(JobPatch::from(job.clone())).await?;
        info!(
            job_id = %job.id,
            source = %job.source,
            destination = %job.destination,
            total_bytes = job.total_bytes,
            "Migration started"
        );

        let id = job.id;
        let run = MigrationRun {
            store: self.store.clone(),
            transfer: self.transfer.clone(),
            source,
            destination,
            cleanup_delay: self.cleanup_delay,
            started,
        };
        let task = tokio::spawn(run.execute(job));

        Ok(JobHandle { id, task })
    }

    /// Start a migration and wait for its terminal state.
    pub async fn run_migration(
        &self,
        dataset: &DatasetMetadata,
        source: &str,
        destination: &str,
    ) -> Result<MigrationJob> {
        self.start_migration(dataset, source, destination)
            .await?
            .wait()
            .await
    }

    pub async fn list_jobs(&self) -> Result<Vec<MigrationJob>> {
        let records = self.store.list().await?;
        records
            .into_iter()
            .map(|record| MigrationJob::try_from(record).map_err(MigrationError::from))
            .collect()
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<MigrationJob>> {
        match self.store.get(id).await? {
            Some(record) => Ok(Some(MigrationJob::try_from(record)?)),
            None => Ok(None),
        }
    }

    fn resolve(&self, id: &str) -> Result<StorageOption> {
        self.catalog
            .get(id)
            .cloned()
            .ok_or_else(|| MigrationError::UnknownOption(id.to_string()))
    }
}

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

struct MigrationRun {
    store: Arc<dyn JobStore>,
    transfer: Arc<dyn Transfer>,
    source: StorageOption,
    destination: StorageOption,
    cleanup_delay: Duration,
    started: Instant,
}

impl MigrationRun {
    #[tracing::instrument(skip_all, fields(job_id = %job.id))]
    async fn execute(self, mut job: MigrationJob) -> MigrationJob {
        match self.drive(&mut job).await {
            Ok(()) => job,
            Err(e) => self.fail(job, e).await,
        }
    }

    async fn drive(&self, job: &mut MigrationJob) -> std::result::Result<(), StepError> {
        self.checkpoint(job, DEPARTURE_PROGRESS, 0).await?;
        let from = self.transfer.departure(&self.source).await?;

        let bulk_bytes = (job.total_bytes as f64 * BULK_FRACTION).round() as u64;
        self.checkpoint(job, BULK_PROGRESS, bulk_bytes).await?;
        let to = self.transfer.arrival(&self.destination).await?;

        if !self.cleanup_delay.is_zero() {
            tokio::time::sleep(self.cleanup_delay).await;
        }

        let elapsed_ms = millis(self.started.elapsed()).max(1.0);
        let network_ms = millis(from + to).max(1.0);

        let completed = MigrationJob {
            notes: Some(format!(
                "Simulated fromLatency={}ms toLatency={}ms cleanupDelay={}ms",
                millis(from),
                millis(to),
                millis(self.cleanup_delay)
            )),
            state: JobState::Completed {
                end_time: Utc::now(),
                throughput_mbps: throughput_mbps(job.total_bytes, elapsed_ms),
                throughput_network_mbps: throughput_mbps(job.total_bytes, network_ms),
            },
            ..job.clone()
        };
        self.persist(job, completed).await?;

        info!(
            elapsed_ms,
            network_ms,
            destination = %job.destination,
            "Migration completed"
        );
        Ok(())
    }

    async fn checkpoint(
        &self,
        job: &mut MigrationJob,
        progress: u8,
        bytes_transferred: u64,
    ) -> std::result::Result<(), StoreError> {
        let next = MigrationJob {
            state: JobState::Running {
                progress,
                bytes_transferred,
            },
            ..job.clone()
        };
        self.persist(job, next).await
    }

    /// Whole-record upsert. `job` only advances once the store accepted `next`.
    async fn persist(
        &self,
        job: &mut MigrationJob,
        next: MigrationJob,
    ) -> std::result::Result<(), StoreError> {
        self.store.upsert(JobPatch::from(next.clone())).await?;
        *job = next;
        Ok(())
    }

    async fn fail(&self, job: MigrationJob, cause: StepError) -> MigrationJob {
        let progress = job.progress();
        let bytes_transferred = job.bytes_transferred();
        let failed = MigrationJob {
            state: JobState::Failed {
                progress,
                bytes_transferred,
                end_time: Utc::now(),
                last_error: cause.to_string(),
            },
            ..job
        };
        warn!(progress = failed.progress(), error = %cause, "Migration failed");

        if let Err(e) = self.store.upsert(JobPatch::from(failed.clone())).await {
            error!(error = %e, "Failed to persist failed migration record");
        }
        failed
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// MiB/s over `window_ms`, rounded to 3 decimals.
fn throughput_mbps(bytes: u64, window_ms: f64) -> f64 {
    if bytes == 0 {
        return 0.0;
    }
    let rate = bytes as f64 / (window_ms / 1000.0) / BYTES_PER_MIB;
    (rate * 1000.0).round() / 1000.0
}
