//! Latency filtering and cost minimisation over the storage catalog.

use common::config::FallbackPolicy;
use common::{DatasetMetadata, LatencySensitivity, StorageCatalog, StorageOption};
use tracing::warn;

use crate::classifier::Tier;
use crate::cost::estimate_cost;
use crate::error::{PlacementError, Result};

/// Candidates for a placement decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ViableSet<'a> {
    pub options: Vec<&'a StorageOption>,
    /// Tighter of the sensitivity and tier ceilings.
    pub ceiling_ms: f64,
    /// True when nothing met the ceiling and the whole catalog was substituted.
    pub fell_back: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementSelector {
    fallback: FallbackPolicy,
}

impl PlacementSelector {
    pub fn new(fallback: FallbackPolicy) -> Self {
        Self { fallback }
    }

    /// Options whose average latency is within both the sensitivity and tier ceilings.
    pub fn select_viable<'a>(
        &self,
        tier: Tier,
        sensitivity: LatencySensitivity,
        catalog: &'a StorageCatalog,
    ) -> Result<ViableSet<'a>> {
        let ceiling_ms = sensitivity
            .latency_ceiling_ms()
            .min(tier.latency_ceiling_ms());

        let options: Vec<_> = catalog
            .iter()
            .filter(|option| option.avg_latency_ms <= ceiling_ms)
            .collect();

        if !options.is_empty() {
            return Ok(ViableSet {
                options,
                ceiling_ms,
                fell_back: false,
            });
        }

        match self.fallback {
            FallbackPolicy::AllowUnconstrained => {
                warn!(
                    %tier,
                    %sensitivity,
                    ceiling_ms,
                    "No storage option meets the latency ceiling, considering the whole catalog"
                );
                Ok(ViableSet {
                    options: catalog.iter().collect(),
                    ceiling_ms,
                    fell_back: true,
                })
            }
            FallbackPolicy::Strict => Err(PlacementError::NoViableOption {
                tier,
                sensitivity,
                ceiling_ms,
            }),
        }
    }
}

/// Cheapest option by estimated monthly cost. Ties keep the earlier option.
pub fn pick_cheapest<'a>(
    dataset: &DatasetMetadata,
    options: &[&'a StorageOption],
) -> Option<&'a StorageOption> {
    let (first, rest) = options.split_first()?;

    let mut best = *first;
    let mut best_cost = estimate_cost(dataset, best);
    for &option in rest {
        let cost = estimate_cost(dataset, option);
        if cost < best_cost {
            best = option;
            best_cost = cost;
        }
    }

    Some(best)
}
