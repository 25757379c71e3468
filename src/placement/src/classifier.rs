//! Hot/warm/cold classification from access metadata.
//!
//! The score is the sum of three independent dimensions:
//!
//! | dimension | formula                              | range   |
//! |-----------|--------------------------------------|---------|
//! | recency   | `max(0, 30 - days_since_access) * 2` | 0..=60  |
//! | frequency | `min(access_count_30d * 1.5, 100)`   | 0..=100 |
//! | priority  | `(6 - business_priority) * 20`       | 20..=100 |
//!
//! A total above 80 is hot, above 30 is warm, anything else is cold. A single
//! dimension can carry a dataset out of cold on its own: priority 1 alone scores 100.

use std::fmt;

use chrono::{DateTime, Utc};
use common::DatasetMetadata;
use common::config::RecencyPolicy;
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

const RECENCY_WINDOW_DAYS: f64 = 30.0;
const RECENCY_WEIGHT: f64 = 2.0;
const MAX_RECENCY_SCORE: f64 = RECENCY_WINDOW_DAYS * RECENCY_WEIGHT;

const FREQUENCY_WEIGHT: f64 = 1.5;
const MAX_FREQUENCY_SCORE: f64 = 100.0;

const PRIORITY_WEIGHT: f64 = 20.0;

const HOT_THRESHOLD: f64 = 80.0;
const WARM_THRESHOLD: f64 = 30.0;

/// Coarse temperature of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    /// Highest average latency a storage option may have to serve this tier.
    pub fn latency_ceiling_ms(&self) -> f64 {
        match self {
            Tier::Hot => 200.0,
            Tier::Warm => 2000.0,
            Tier::Cold => f64::INFINITY,
        }
    }

    fn from_score(total: f64) -> Self {
        if total > HOT_THRESHOLD {
            Tier::Hot
        } else if total > WARM_THRESHOLD {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Hot => write!(f, "hot"),
            Tier::Warm => write!(f, "warm"),
            Tier::Cold => write!(f, "cold"),
        }
    }
}

/// Per-dimension breakdown of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierScore {
    pub recency: f64,
    pub frequency: f64,
    pub priority: f64,
}

impl TierScore {
    pub fn total(&self) -> f64 {
        self.recency + self.frequency + self.priority
    }

    pub fn tier(&self) -> Tier {
        Tier::from_score(self.total())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TierClassifier {
    recency: RecencyPolicy,
}

impl TierClassifier {
    pub fn new(recency: RecencyPolicy) -> Self {
        Self { recency }
    }

    pub fn classify(&self, dataset: &DatasetMetadata) -> Tier {
        self.classify_at(dataset, Utc::now())
    }

    pub fn classify_at(&self, dataset: &DatasetMetadata, now: DateTime<Utc>) -> Tier {
        self.score_at(dataset, now).tier()
    }

    pub fn score_at(&self, dataset: &DatasetMetadata, now: DateTime<Utc>) -> TierScore {
        let days_since_access =
            (now - dataset.last_accessed).num_milliseconds() as f64 / MILLIS_PER_DAY;

        let mut recency = (RECENCY_WINDOW_DAYS - days_since_access).max(0.0) * RECENCY_WEIGHT;
        if self.recency == RecencyPolicy::Clamped {
            recency = recency.min(MAX_RECENCY_SCORE);
        }

        let frequency =
            (dataset.access_count_30d as f64 * FREQUENCY_WEIGHT).min(MAX_FREQUENCY_SCORE);

        let priority = f64::from(6 - dataset.business_priority.get()) * PRIORITY_WEIGHT;

        TierScore {
            recency,
            frequency,
            priority,
        }
    }
}
