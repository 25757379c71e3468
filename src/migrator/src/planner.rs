//! Turns placement recommendations into migrations.

use chrono::{DateTime, Utc};
use common::DatasetMetadata;
use placement::{Recommendation, RecommendationEngine};
use tracing::{debug, info};

use crate::error::ReconcileError;
use crate::orchestrator::{JobHandle, MigrationOrchestrator};

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Already stored at the recommended location.
    InPlace(Recommendation),
    /// No current location, so there is nothing to move.
    Unplaced(Recommendation),
    Migrating {
        recommendation: Recommendation,
        from: String,
        handle: JobHandle,
    },
}

impl ReconcileOutcome {
    pub fn recommendation(&self) -> &Recommendation {
        match self {
            ReconcileOutcome::InPlace(recommendation)
            | ReconcileOutcome::Unplaced(recommendation)
            | ReconcileOutcome::Migrating { recommendation, .. } => recommendation,
        }
    }
}

pub struct MigrationPlanner {
    engine: RecommendationEngine,
    orchestrator: MigrationOrchestrator,
}

impl MigrationPlanner {
    pub fn new(engine: RecommendationEngine, orchestrator: MigrationOrchestrator) -> Self {
        Self {
            engine,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &MigrationOrchestrator {
        &self.orchestrator
    }

    pub async fn reconcile(
        &self,
        dataset: &DatasetMetadata,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile_at(dataset, Utc::now()).await
    }

    /// Recommend a placement and start a migration if the dataset lives elsewhere.
    pub async fn reconcile_at(
        &self,
        dataset: &DatasetMetadata,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let recommendation = self.engine.recommend_at(dataset, now)?;

        let Some(current) = dataset.current_location.as_deref() else {
            debug!(dataset = %dataset.name, "Dataset has no current location");
            return Ok(ReconcileOutcome::Unplaced(recommendation));
        };

        if current == recommendation.recommended_location {
            debug!(dataset = %dataset.name, location = current, "Dataset already placed");
            return Ok(ReconcileOutcome::InPlace(recommendation));
        }

        let handle = self
            .orchestrator
            .start_migration(dataset, current, &recommendation.recommended_location)
            .await?;
        info!(
            dataset = %dataset.name,
            from = current,
            to = %recommendation.recommended_location,
            tier = %recommendation.tier,
            job_id = %handle.id(),
            "Reconcile started migration"
        );

        Ok(ReconcileOutcome::Migrating {
            recommendation,
            from: current.to_string(),
            handle,
        })
    }
}
