use common::ValidationError;
use placement::PlacementError;
use thiserror::Error;
use uuid::Uuid;

use crate::job::JobStatus;

/// A persisted job record that violates the job lifecycle invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Job {id} reports progress {progress}, expected 0..=100")]
    ProgressOutOfRange { id: Uuid, progress: u8 },

    #[error("Job {id} transferred {bytes} of {total} bytes")]
    BytesOutOfRange { id: Uuid, bytes: u64, total: u64 },

    #[error("Job {id} is {status} but has no {field}")]
    MissingField {
        id: Uuid,
        status: JobStatus,
        field: &'static str,
    },

    #[error("Job {id} is {status} but carries {field}")]
    UnexpectedField {
        id: Uuid,
        status: JobStatus,
        field: &'static str,
    },

    #[error("Job {id} is {status} but {reason}")]
    Inconsistent {
        id: Uuid,
        status: JobStatus,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Job collection serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job {0} does not exist and the update lacks mandatory fields")]
    IncompleteRecord(Uuid),

    #[error("Illegal update of job {id}: {reason}")]
    IllegalTransition { id: Uuid, reason: String },

    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    #[error("Job store is closed")]
    Closed,
}

/// A simulated transfer leg that could not be carried out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error("Transfer at {location} failed: {reason}")]
    Leg { location: String, reason: String },

    #[error("Transfer at {location} has an unusable delay of {delay_ms}ms")]
    InvalidDelay { location: String, delay_ms: f64 },
}

/// Errors raised before a migration job exists, or while reading job history.
///
/// Failures after the job has been created are recorded on the job itself.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown storage option: {0}")]
    UnknownOption(String),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Corrupted job record: {0}")]
    CorruptRecord(#[from] RecordError),

    #[error("Migration task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
