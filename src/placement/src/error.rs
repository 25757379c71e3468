use common::{LatencySensitivity, ValidationError};
use thiserror::Error;

use crate::classifier::Tier;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("Invalid dataset: {0}")]
    Validation(#[from] ValidationError),

    #[error(
        "No storage option meets the {ceiling_ms}ms ceiling for tier {tier} with {sensitivity} latency sensitivity"
    )]
    NoViableOption {
        tier: Tier,
        sensitivity: LatencySensitivity,
        ceiling_ms: f64,
    },
}

pub type Result<T> = std::result::Result<T, PlacementError>;
