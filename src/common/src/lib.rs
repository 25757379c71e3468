pub mod catalog;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{CatalogError, StorageCatalog, StorageOption};
pub use dataset::{
    BusinessPriority, DatasetMetadata, EgressPattern, LatencySensitivity, ValidationError,
};
