//! Monthly cost estimates for keeping a dataset on a storage option.
//!
//! Estimates are in the catalog's minor currency units and only feed placement
//! decisions. Sizes are not validated here.

use common::{DatasetMetadata, StorageOption};
use serde::Serialize;

/// Storage and egress components of a monthly estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub storage: f64,
    pub egress: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.storage + self.egress
    }
}

pub fn cost_breakdown(dataset: &DatasetMetadata, option: &StorageOption) -> CostBreakdown {
    let storage = dataset.size_gb * option.storage_cost_per_gb_month;
    let egress = dataset.size_gb
        * dataset.egress_pattern.monthly_egress_fraction()
        * option.egress_cost_per_gb;

    CostBreakdown { storage, egress }
}

/// Estimated monthly cost: storage plus expected egress.
pub fn estimate_cost(dataset: &DatasetMetadata, option: &StorageOption) -> f64 {
    cost_breakdown(dataset, option).total()
}
