//! Migration jobs: persisted job history, simulated transfers and the
//! orchestrator that drives each job to a terminal state.

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod planner;
pub mod store;
pub mod transfer;

pub use error::{MigrationError, ReconcileError, RecordError, StoreError, TransferError};
pub use job::{JobPatch, JobRecord, JobState, JobStatus, MigrationJob};
pub use orchestrator::{JobHandle, MigrationOrchestrator};
pub use planner::{MigrationPlanner, ReconcileOutcome};
pub use store::{JobStore, ObjectStoreJobStore};
pub use transfer::{SimulatedTransfer, Transfer};
