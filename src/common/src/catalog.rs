//! Registry of storage options placement can choose from.
//!
//! The catalog is loaded once at startup and treated as read-only afterwards.
//! Iteration order is the configured order and is part of the contract:
//! ties during cost comparison keep the option that comes first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configured storage backend with its cost and latency profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOption {
    pub id: String,
    #[serde(alias = "provider")]
    pub display_name: String,
    /// Minor currency units per GB-month.
    #[serde(rename = "storageCostPerGBMonth")]
    pub storage_cost_per_gb_month: f64,
    /// Minor currency units per GB leaving the provider.
    #[serde(rename = "egressCostPerGB")]
    pub egress_cost_per_gb: f64,
    /// Average access latency. Archival classes use very large values.
    pub avg_latency_ms: f64,
}

impl StorageOption {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        storage_cost_per_gb_month: f64,
        egress_cost_per_gb: f64,
        avg_latency_ms: f64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            storage_cost_per_gb_month,
            egress_cost_per_gb,
            avg_latency_ms,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }

        for (field, value) in [
            ("storageCostPerGBMonth", self.storage_cost_per_gb_month),
            ("egressCostPerGB", self.egress_cost_per_gb),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogError::InvalidCost {
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        if !self.avg_latency_ms.is_finite() || self.avg_latency_ms < 0.0 {
            return Err(CatalogError::InvalidLatency {
                id: self.id.clone(),
                value: self.avg_latency_ms,
            });
        }

        Ok(())
    }
}

/// Invalid catalog configuration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Storage catalog must contain at least one option")]
    Empty,

    #[error("Storage option id must not be empty")]
    EmptyId,

    #[error("Storage option {0} is registered more than once")]
    DuplicateId(String),

    #[error("Storage option {id} has invalid {field}: {value}")]
    InvalidCost {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("Storage option {id} has invalid average latency: {value} ms")]
    InvalidLatency { id: String, value: f64 },
}

/// Ordered, validated and non-empty set of storage options.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCatalog {
    options: Vec<StorageOption>,
}

impl StorageCatalog {
    pub fn new(options: Vec<StorageOption>) -> Result<Self, CatalogError> {
        if options.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            option.validate()?;
            if !seen.insert(option.id.as_str()) {
                return Err(CatalogError::DuplicateId(option.id.clone()));
            }
        }

        Ok(Self { options })
    }

    /// The four storage options shipped as the default configuration.
    pub fn builtin() -> Self {
        Self {
            options: builtin_options(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&StorageOption> {
        self.options.iter().find(|option| option.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorageOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

pub fn builtin_options() -> Vec<StorageOption> {
    vec![
        StorageOption::new("minio-on-prem", "On-Prem (MinIO)", 3.0, 1.0, 5.0),
        StorageOption::new("aws-s3-vanilla", "AWS S3", 2.3, 9.0, 100.0),
        StorageOption::new("cloudflare-r2", "Cloudflare R2", 1.5, 0.0, 150.0),
        // Retrieval from archive takes about ten minutes.
        StorageOption::new("aws-glacier", "AWS Glacier", 0.36, 9.0, 600_000.0),
    ]
}
