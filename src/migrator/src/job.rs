//! Migration job model.
//!
//! `MigrationJob` is the typed view used by the orchestrator: each lifecycle
//! state carries only the fields valid in that state. `JobRecord` is the flat
//! shape written to the job collection, and `JobPatch` is a partial record
//! merged into an existing one by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use common::DatasetMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecordError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Running {
        progress: u8,
        bytes_transferred: u64,
    },
    Completed {
        end_time: DateTime<Utc>,
        /// Observed end-to-end rate in MiB/s.
        throughput_mbps: f64,
        /// Rate over the simulated network window only, in MiB/s.
        throughput_network_mbps: f64,
    },
    Failed {
        progress: u8,
        bytes_transferred: u64,
        end_time: DateTime<Utc>,
        last_error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationJob {
    pub id: Uuid,
    pub dataset_name: String,
    /// Dataset as it was when the job started.
    pub dataset: Option<DatasetMetadata>,
    pub source: String,
    pub destination: String,
    pub total_bytes: u64,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub state: JobState,
}

impl MigrationJob {
    pub fn status(&self) -> JobStatus {
        match self.state {
            JobState::Running { .. } => JobStatus::Running,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn progress(&self) -> u8 {
        match self.state {
            JobState::Running { progress, .. } | JobState::Failed { progress, .. } => progress,
            JobState::Completed { .. } => 100,
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        match self.state {
            JobState::Running {
                bytes_transferred, ..
            }
            | JobState::Failed {
                bytes_transferred, ..
            } => bytes_transferred,
            JobState::Completed { .. } => self.total_bytes,
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        match self.state {
            JobState::Running { .. } => None,
            JobState::Completed { end_time, .. } | JobState::Failed { end_time, .. } => {
                Some(end_time)
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { last_error, .. } => Some(last_error),
            _ => None,
        }
    }
}

/// Persisted shape of a job, one element of the job collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub dataset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_metadata: Option<DatasetMetadata>,
    pub source: String,
    pub destination: String,
    pub status: JobStatus,
    pub progress: u8,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    #[serde(rename = "throughputMBps")]
    pub throughput_mbps: f64,
    #[serde(
        rename = "throughputNetworkMBps",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub throughput_network_mbps: Option<f64>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<MigrationJob> for JobRecord {
    fn from(job: MigrationJob) -> Self {
        let status = job.status();
        let progress = job.progress();
        let bytes_transferred = job.bytes_transferred();

        let (throughput_mbps, throughput_network_mbps, end_time, last_error) = match job.state {
            JobState::Running { .. } => (0.0, None, None, None),
            JobState::Completed {
                end_time,
                throughput_mbps,
                throughput_network_mbps,
            } => (
                throughput_mbps,
                Some(throughput_network_mbps),
                Some(end_time),
                None,
            ),
            JobState::Failed {
                end_time,
                last_error,
                ..
            } => (0.0, None, Some(end_time), Some(last_error)),
        };

        JobRecord {
            id: job.id,
            dataset_name: job.dataset_name,
            dataset_metadata: job.dataset,
            source: job.source,
            destination: job.destination,
            status,
            progress,
            bytes_transferred,
            total_bytes: job.total_bytes,
            throughput_mbps,
            throughput_network_mbps,
            start_time: job.start_time,
            end_time,
            last_error,
            notes: job.notes,
        }
    }
}

impl TryFrom<JobRecord> for MigrationJob {
    type Error = RecordError;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let status = record.status;

        if record.progress > 100 {
            return Err(RecordError::ProgressOutOfRange {
                id,
                progress: record.progress,
            });
        }
        if record.bytes_transferred > record.total_bytes {
            return Err(RecordError::BytesOutOfRange {
                id,
                bytes: record.bytes_transferred,
                total: record.total_bytes,
            });
        }

        let missing = |field| RecordError::MissingField { id, status, field };
        let unexpected = |field| RecordError::UnexpectedField { id, status, field };
        let inconsistent = |reason| RecordError::Inconsistent { id, status, reason };

        // A zero-byte job has nothing left to transfer from the start.
        let all_bytes = record.bytes_transferred == record.total_bytes && record.total_bytes > 0;

        let state = match status {
            JobStatus::Running => {
                if record.end_time.is_some() {
                    return Err(unexpected("endTime"));
                }
                if record.last_error.is_some() {
                    return Err(unexpected("lastError"));
                }
                if record.progress == 100 {
                    return Err(inconsistent("reports progress 100"));
                }
                if all_bytes {
                    return Err(inconsistent("reports all bytes transferred"));
                }
                JobState::Running {
                    progress: record.progress,
                    bytes_transferred: record.bytes_transferred,
                }
            }
            JobStatus::Completed => {
                if record.last_error.is_some() {
                    return Err(unexpected("lastError"));
                }
                if record.progress != 100 {
                    return Err(inconsistent("does not report progress 100"));
                }
                if record.bytes_transferred != record.total_bytes {
                    return Err(inconsistent("does not report all bytes transferred"));
                }
                JobState::Completed {
                    end_time: record.end_time.ok_or_else(|| missing("endTime"))?,
                    throughput_mbps: record.throughput_mbps,
                    throughput_network_mbps: record
                        .throughput_network_mbps
                        .ok_or_else(|| missing("throughputNetworkMBps"))?,
                }
            }
            JobStatus::Failed => {
                if record.progress == 100 {
                    return Err(inconsistent("reports progress 100"));
                }
                if all_bytes {
                    return Err(inconsistent("reports all bytes transferred"));
                }
                JobState::Failed {
                    progress: record.progress,
                    bytes_transferred: record.bytes_transferred,
                    end_time: record.end_time.ok_or_else(|| missing("endTime"))?,
                    last_error: record.last_error.ok_or_else(|| missing("lastError"))?,
                }
            }
        };

        Ok(MigrationJob {
            id,
            dataset_name: record.dataset_name,
            dataset: record.dataset_metadata,
            source: record.source,
            destination: record.destination,
            total_bytes: record.total_bytes,
            start_time: record.start_time,
            notes: record.notes,
            state,
        })
    }
}

/// Partial job record. Unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub id: Uuid,
    pub dataset_name: Option<String>,
    pub dataset_metadata: Option<DatasetMetadata>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub bytes_transferred: Option<u64>,
    pub total_bytes: Option<u64>,
    pub throughput_mbps: Option<f64>,
    pub throughput_network_mbps: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub notes: Option<String>,
}

impl JobPatch {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Build a new record from this patch.
    ///
    /// The dataset name, both locations, the status, the total size and the
    /// start time are mandatory. Counters default to zero.
    pub fn into_record(self) -> Result<JobRecord, StoreError> {
        let id = self.id;
        let incomplete = || StoreError::IncompleteRecord(id);

        Ok(JobRecord {
            id,
            dataset_name: self.dataset_name.ok_or_else(incomplete)?,
            dataset_metadata: self.dataset_metadata,
            source: self.source.ok_or_else(incomplete)?,
            destination: self.destination.ok_or_else(incomplete)?,
            status: self.status.ok_or_else(incomplete)?,
            progress: self.progress.unwrap_or(0),
            bytes_transferred: self.bytes_transferred.unwrap_or(0),
            total_bytes: self.total_bytes.ok_or_else(incomplete)?,
            throughput_mbps: self.throughput_mbps.unwrap_or(0.0),
            throughput_network_mbps: self.throughput_network_mbps,
            start_time: self.start_time.ok_or_else(incomplete)?,
            end_time: self.end_time,
            last_error: self.last_error,
            notes: self.notes,
        })
    }

    /// Merge this patch over `current`.
    ///
    /// A terminal record only accepts patches that leave it unchanged, so
    /// replaying the final update is harmless. Progress and transferred bytes
    /// never decrease and the total size is fixed at creation.
    pub fn apply_to(self, current: &JobRecord) -> Result<JobRecord, StoreError> {
        let id = current.id;
        let illegal = |reason: String| StoreError::IllegalTransition { id, reason };

        let merged = JobRecord {
            id,
            dataset_name: self
                .dataset_name
                .unwrap_or_else(|| current.dataset_name.clone()),
            dataset_metadata: self
                .dataset_metadata
                .or_else(|| current.dataset_metadata.clone()),
            source: self.source.unwrap_or_else(|| current.source.clone()),
            destination: self
                .destination
                .unwrap_or_else(|| current.destination.clone()),
            status: self.status.unwrap_or(current.status),
            progress: self.progress.unwrap_or(current.progress),
            bytes_transferred: self.bytes_transferred.unwrap_or(current.bytes_transferred),
            total_bytes: self.total_bytes.unwrap_or(current.total_bytes),
            throughput_mbps: self.throughput_mbps.unwrap_or(current.throughput_mbps),
            throughput_network_mbps: self
                .throughput_network_mbps
                .or(current.throughput_network_mbps),
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.or(current.end_time),
            last_error: self.last_error.or_else(|| current.last_error.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        };

        if current.status.is_terminal() {
            if merged != *current {
                return Err(illegal(format!("job is already {}", current.status)));
            }
            return Ok(merged);
        }
        if merged.total_bytes != current.total_bytes {
            return Err(illegal(format!(
                "total size is fixed at {} bytes",
                current.total_bytes
            )));
        }
        if merged.progress < current.progress {
            return Err(illegal(format!(
                "progress would decrease from {} to {}",
                current.progress, merged.progress
            )));
        }
        if merged.bytes_transferred < current.bytes_transferred {
            return Err(illegal(format!(
                "transferred bytes would decrease from {} to {}",
                current.bytes_transferred, merged.bytes_transferred
            )));
        }

        Ok(merged)
    }
}

impl From<JobRecord> for JobPatch {
    fn from(record: JobRecord) -> Self {
        JobPatch {
            id: record.id,
            dataset_name: Some(record.dataset_name),
            dataset_metadata: record.dataset_metadata,
            source: Some(record.source),
            destination: Some(record.destination),
            status: Some(record.status),
            progress: Some(record.progress),
            bytes_transferred: Some(record.bytes_transferred),
            total_bytes: Some(record.total_bytes),
            throughput_mbps: Some(record.throughput_mbps),
            throughput_network_mbps: record.throughput_network_mbps,
            start_time: Some(record.start_time),
            end_time: record.end_time,
            last_error: record.last_error,
            notes: record.notes,
        }
    }
}

impl From<MigrationJob> for JobPatch {
    fn from(job: MigrationJob) -> Self {
        JobRecord::from(job).into()
    }
}
