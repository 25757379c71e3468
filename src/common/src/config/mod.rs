use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::catalog::{CatalogError, StorageCatalog, StorageOption, builtin_options};

/// Storage options available to placement, in catalog order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub options: Vec<StorageOption>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            options: builtin_options(),
        }
    }
}

/// What placement does when no option meets the latency ceiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Consider the whole catalog instead of returning nothing.
    #[default]
    AllowUnconstrained,
    /// Fail the recommendation.
    Strict,
}

/// How the recency sub-score treats access timestamps outside the 0..30 day window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyPolicy {
    /// Recency never exceeds the "accessed now" score of 60.
    #[default]
    Clamped,
    /// A future `lastAccessed` keeps increasing the score.
    Unclamped,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default)]
    pub recency: RecencyPolicy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Fixed bookkeeping delay after the destination write.
    ///
    /// Env: TIERFLOW__MIGRATION__CLEANUP_DELAY
    #[serde(with = "humantime_serde")]
    pub cleanup_delay: Duration,
    /// Multiplier applied to the average latency of each transfer leg.
    ///
    /// Env: TIERFLOW__MIGRATION__LATENCY_SCALE
    pub latency_scale: f64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            cleanup_delay: Duration::from_millis(20),
            latency_scale: 1.0,
        }
    }
}

/// Where migration job history is persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobStoreConfig {
    /// Object store DSN (`file:///path` or `memory://`)
    pub dsn: String,
    /// Object key of the job collection
    pub path: String,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("file:///.data"),
            path: String::from("migrations.json"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    pub migration: MigrationConfig,
    pub job_store: JobStoreConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Path::new("tierflow.toml"))
            .extract()
            .map_err(Box::new)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TIERFLOW__").split("__"))
    }

    /// Build the validated storage catalog.
    pub fn catalog(&self) -> Result<StorageCatalog, CatalogError> {
        StorageCatalog::new(self.catalog.options.clone())
    }

    /// Reject configuration that cannot run a migration. Fatal at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.catalog().context("Invalid storage catalog")?;

        let scale = self.migration.latency_scale;
        if !scale.is_finite() || scale < 0.0 {
            bail!("Latency scale must be a non-negative number, got {scale}");
        }

        if self.job_store.dsn.is_empty() {
            bail!("Job store DSN cannot be empty");
        }

        if self.job_store.path.is_empty() {
            bail!("Job store path cannot be empty");
        }

        crate::storage::storage_dsn_to_path(&self.job_store.dsn)
            .context("Invalid job store DSN")?;

        Ok(())
    }
}
