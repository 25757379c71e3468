//! Transfer-delay seam used by the orchestrator.
//!
//! No bytes are moved. A transfer only accounts for the time a real copy would
//! spend setting up a read at the source and committing at the destination.

use std::time::Duration;

use async_trait::async_trait;
use common::StorageOption;

use crate::error::TransferError;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

#[async_trait]
pub trait Transfer: Send + Sync {
    /// Connection and read setup at the source. Returns the time spent.
    async fn departure(&self, source: &StorageOption) -> Result<Duration, TransferError>;

    /// Write and commit at the destination. Returns the time spent.
    async fn arrival(&self, destination: &StorageOption) -> Result<Duration, TransferError>;
}

/// Sleeps for each option's average latency, multiplied by `latency_scale`.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedTransfer {
    latency_scale: f64,
}

impl Default for SimulatedTransfer {
    fn default() -> Self {
        Self { latency_scale: 1.0 }
    }
}

impl SimulatedTransfer {
    pub fn new(latency_scale: f64) -> Self {
        Self { latency_scale }
    }

    pub fn delay_for(&self, option: &StorageOption) -> Result<Duration, TransferError> {
        let delay_ms = option.avg_latency_ms * self.latency_scale;
        if !delay_ms.is_finite() || delay_ms < 0.0 {
            return Err(TransferError::InvalidDelay {
                location: option.id.clone(),
                delay_ms,
            });
        }
        Ok(Duration::from_nanos((delay_ms * NANOS_PER_MILLI).round() as u64))
    }

    async fn simulate(&self, option: &StorageOption) -> Result<Duration, TransferError> {
        let delay = self.delay_for(option)?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(delay)
    }
}

#[async_trait]
impl Transfer for SimulatedTransfer {
    async fn departure(&self, source: &StorageOption) -> Result<Duration, TransferError> {
        self.simulate(source).await
    }

    async fn arrival(&self, destination: &StorageOption) -> Result<Duration, TransferError> {
        self.simulate(destination).await
    }
}
