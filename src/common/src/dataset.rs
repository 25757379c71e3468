use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::StorageCatalog;

/// How quickly a dataset must be served when it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencySensitivity {
    Critical,
    High,
    Medium,
    Low,
}

impl LatencySensitivity {
    /// Highest acceptable average latency in milliseconds.
    pub fn latency_ceiling_ms(&self) -> f64 {
        match self {
            LatencySensitivity::Critical => 50.0,
            LatencySensitivity::High => 200.0,
            LatencySensitivity::Medium => 2000.0,
            LatencySensitivity::Low => f64::INFINITY,
        }
    }
}

impl fmt::Display for LatencySensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencySensitivity::Critical => write!(f, "critical"),
            LatencySensitivity::High => write!(f, "high"),
            LatencySensitivity::Medium => write!(f, "medium"),
            LatencySensitivity::Low => write!(f, "low"),
        }
    }
}

/// Qualitative estimate of how much of a dataset leaves the provider each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressPattern {
    High,
    Medium,
    Low,
}

impl EgressPattern {
    /// Fraction of the stored bytes assumed to egress per month.
    pub fn monthly_egress_fraction(&self) -> f64 {
        match self {
            EgressPattern::High => 0.30,
            EgressPattern::Medium => 0.10,
            EgressPattern::Low => 0.01,
        }
    }
}

impl fmt::Display for EgressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EgressPattern::High => write!(f, "high"),
            EgressPattern::Medium => write!(f, "medium"),
            EgressPattern::Low => write!(f, "low"),
        }
    }
}

/// Business priority from 1 (highest) to 5 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BusinessPriority(u8);

impl BusinessPriority {
    pub const HIGHEST: BusinessPriority = BusinessPriority(1);
    pub const LOWEST: BusinessPriority = BusinessPriority(5);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidPriority(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BusinessPriority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BusinessPriority> for u8 {
    fn from(priority: BusinessPriority) -> Self {
        priority.0
    }
}

impl fmt::Display for BusinessPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Largest accepted dataset size. The size in bytes must fit in a `u64`.
pub const MAX_SIZE_GB: f64 = (u64::MAX >> 30) as f64;

/// Malformed dataset metadata. Rejected before any classification happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Dataset name must not be empty")]
    EmptyName,

    #[error("Dataset {name} has invalid size {size_gb} GB (must be positive and finite)")]
    InvalidSize { name: String, size_gb: f64 },

    #[error("Dataset {name} has size {size_gb} GB, above the limit of 17179869183 GB")]
    SizeTooLarge { name: String, size_gb: f64 },

    #[error("Business priority {0} is outside 1..=5")]
    InvalidPriority(u8),

    #[error("Dataset {name} references unknown storage location {location}")]
    UnknownLocation { name: String, location: String },
}

/// Access-pattern metadata of one logical dataset.
///
/// Written by the access-event pipeline, read-only for placement and migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub name: String,
    #[serde(rename = "sizeGB")]
    pub size_gb: f64,
    /// Rolling access count over the last 30 days.
    pub access_count_30d: u64,
    pub last_accessed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    pub latency_sensitivity: LatencySensitivity,
    pub egress_pattern: EgressPattern,
    pub business_priority: BusinessPriority,
}

impl DatasetMetadata {
    /// Check the metadata against the data model and the given catalog.
    pub fn validate(&self, catalog: &StorageCatalog) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if !self.size_gb.is_finite() || self.size_gb <= 0.0 {
            return Err(ValidationError::InvalidSize {
                name: self.name.clone(),
                size_gb: self.size_gb,
            });
        }

        if self.size_gb > MAX_SIZE_GB {
            return Err(ValidationError::SizeTooLarge {
                name: self.name.clone(),
                size_gb: self.size_gb,
            });
        }

        if let Some(location) = &self.current_location {
            if !catalog.contains(location) {
                return Err(ValidationError::UnknownLocation {
                    name: self.name.clone(),
                    location: location.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Parse a dataset file: either a JSON array of datasets or a map keyed by dataset name.
pub fn parse_datasets(raw: &str) -> Result<Vec<DatasetMetadata>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DatasetFile {
        List(Vec<DatasetMetadata>),
        Keyed(std::collections::BTreeMap<String, DatasetMetadata>),
    }

    Ok(match serde_json::from_str::<DatasetFile>(raw)? {
        DatasetFile::List(datasets) => datasets,
        DatasetFile::Keyed(datasets) => datasets.into_values().collect(),
    })
}
