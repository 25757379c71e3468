//! Test configuration builder for creating test setups quickly.

use std::time::Duration;

use crate::catalog::StorageOption;
use crate::config::{Configuration, FallbackPolicy, JobStoreConfig, RecencyPolicy};

/// Builder for creating test configurations.
///
/// # Example
///
/// ```rust,ignore
/// use common::testing::TestConfigBuilder;
///
/// let config = TestConfigBuilder::new()
///     .in_memory()
///     .without_delays()
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: Configuration,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    /// Start from the default configuration (built-in catalog, 20ms cleanup delay).
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    /// Keep job history in an in-memory object store.
    pub fn in_memory(mut self) -> Self {
        self.config.job_store = JobStoreConfig {
            dsn: "memory://".to_string(),
            ..JobStoreConfig::default()
        };
        self
    }

    /// Zero cleanup delay and no simulated transfer latency.
    pub fn without_delays(mut self) -> Self {
        self.config.migration.cleanup_delay = Duration::ZERO;
        self.config.migration.latency_scale = 0.0;
        self
    }

    /// Replace the catalog with the given options, in order.
    pub fn with_options(mut self, options: Vec<StorageOption>) -> Self {
        self.config.catalog.options = options;
        self
    }

    /// Append one option to the catalog.
    pub fn with_option(mut self, option: StorageOption) -> Self {
        self.config.catalog.options.push(option);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.config.placement.fallback = fallback;
        self
    }

    pub fn with_recency(mut self, recency: RecencyPolicy) -> Self {
        self.config.placement.recency = recency;
        self
    }

    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.config.migration.cleanup_delay = delay;
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}
