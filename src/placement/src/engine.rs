use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::config::PlacementConfig;
use common::{DatasetMetadata, StorageCatalog, StorageOption};
use serde::Serialize;
use tracing::debug;

use crate::classifier::{Tier, TierClassifier, TierScore};
use crate::cost::estimate_cost;
use crate::error::{PlacementError, Result};
use crate::selector::{PlacementSelector, pick_cheapest};

/// Where a dataset should live and what it would cost there.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub tier: Tier,
    /// Always an id from the engine's catalog.
    pub recommended_location: String,
    pub estimated_monthly_cost: f64,
}

/// A recommendation together with how it was reached and what it saves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    pub dataset_name: String,
    pub recommendation: Recommendation,
    pub score: TierScore,
    pub fell_back: bool,
    pub current_location: Option<String>,
    pub current_monthly_cost: Option<f64>,
    /// Current cost minus recommended cost. Negative when the move costs more.
    pub monthly_savings: Option<f64>,
}

impl PlacementReport {
    pub fn needs_migration(&self) -> bool {
        self.current_location
            .as_deref()
            .is_some_and(|current| current != self.recommendation.recommended_location)
    }
}

/// Composes classification and placement into a single recommendation.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    catalog: Arc<StorageCatalog>,
    classifier: TierClassifier,
    selector: PlacementSelector,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<StorageCatalog>) -> Self {
        Self {
            catalog,
            classifier: TierClassifier::default(),
            selector: PlacementSelector::default(),
        }
    }

    pub fn from_config(catalog: Arc<StorageCatalog>, config: &PlacementConfig) -> Self {
        Self {
            catalog,
            classifier: TierClassifier::new(config.recency),
            selector: PlacementSelector::new(config.fallback),
        }
    }

    pub fn catalog(&self) -> &Arc<StorageCatalog> {
        &self.catalog
    }

    pub fn recommend(&self, dataset: &DatasetMetadata) -> Result<Recommendation> {
        self.recommend_at(dataset, Utc::now())
    }

    pub fn recommend_at(
        &self,
        dataset: &DatasetMetadata,
        now: DateTime<Utc>,
    ) -> Result<Recommendation> {
        self.place(dataset, now)
            .map(|placement| placement.recommendation)
    }

    pub fn evaluate(&self, dataset: &DatasetMetadata) -> Result<PlacementReport> {
        self.evaluate_at(dataset, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        dataset: &DatasetMetadata,
        now: DateTime<Utc>,
    ) -> Result<PlacementReport> {
        let placement = self.place(dataset, now)?;

        let current_monthly_cost = dataset
            .current_location
            .as_deref()
            .and_then(|id| self.catalog.get(id))
            .map(|option| estimate_cost(dataset, option));
        let monthly_savings = current_monthly_cost
            .map(|current| current - placement.recommendation.estimated_monthly_cost);

        Ok(PlacementReport {
            dataset_name: dataset.name.clone(),
            recommendation: placement.recommendation,
            score: placement.score,
            fell_back: placement.fell_back,
            current_location: dataset.current_location.clone(),
            current_monthly_cost,
            monthly_savings,
        })
    }

    fn place(&self, dataset: &DatasetMetadata, now: DateTime<Utc>) -> Result<Placement> {
        dataset.validate(&self.catalog)?;

        let score = self.classifier.score_at(dataset, now);
        let tier = score.tier();

        let viable = self
            .selector
            .select_viable(tier, dataset.latency_sensitivity, &self.catalog)?;
        let best: &StorageOption =
            pick_cheapest(dataset, &viable.options).ok_or(PlacementError::NoViableOption {
                tier,
                sensitivity: dataset.latency_sensitivity,
                ceiling_ms: viable.ceiling_ms,
            })?;

        let recommendation = Recommendation {
            tier,
            recommended_location: best.id.clone(),
            estimated_monthly_cost: estimate_cost(dataset, best),
        };

        debug!(
            dataset = %dataset.name,
            %tier,
            score = score.total(),
            location = %recommendation.recommended_location,
            cost = recommendation.estimated_monthly_cost,
            "Placement computed"
        );

        Ok(Placement {
            recommendation,
            score,
            fell_back: viable.fell_back,
        })
    }
}

struct Placement {
    recommendation: Recommendation,
    score: TierScore,
    fell_back: bool,
}
