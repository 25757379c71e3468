//! Tier classification, cost estimation and placement selection for datasets.

pub mod classifier;
pub mod cost;
pub mod engine;
pub mod error;
pub mod selector;

pub use classifier::{Tier, TierClassifier, TierScore};
pub use cost::{CostBreakdown, cost_breakdown, estimate_cost};
pub use engine::{PlacementReport, Recommendation, RecommendationEngine};
pub use error::{PlacementError, Result};
pub use selector::{PlacementSelector, ViableSet, pick_cheapest};
