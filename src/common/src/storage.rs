use anyhow::Result;
use object_store::{ObjectStore, local::LocalFileSystem, memory::InMemory};
use std::sync::Arc;
use url::Url;

use crate::config::JobStoreConfig;

/// Create the object store backing the migration job history
pub fn create_job_object_store(config: &JobStoreConfig) -> Result<Arc<dyn ObjectStore>> {
    create_object_store_from_dsn(&config.dsn)
}

/// Extract the filesystem path from a storage DSN
///
/// # Examples
/// ```
/// use common::storage::storage_dsn_to_path;
///
/// assert_eq!(storage_dsn_to_path("file:///.data").unwrap(), ".data");
/// assert_eq!(storage_dsn_to_path("file:///tmp/jobs").unwrap(), "/tmp/jobs");
/// assert_eq!(storage_dsn_to_path("memory://").unwrap(), "memory://");
/// ```
pub fn storage_dsn_to_path(dsn: &str) -> Result<String> {
    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => Ok(file_path(&url)?.to_string()),
        "memory" => Ok("memory://".to_string()),
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory",
            scheme
        )),
    }
}

/// Create an object store from a DSN string
pub fn create_object_store_from_dsn(dsn: &str) -> Result<Arc<dyn ObjectStore>> {
    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => {
            let path = file_path(&url)?;
            std::fs::create_dir_all(path)?;
            Ok(Arc::new(LocalFileSystem::new_with_prefix(path)?))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory",
            scheme
        )),
    }
}

fn file_path(url: &Url) -> Result<&str> {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return Err(anyhow::anyhow!(
            "File DSN must specify a path: file:///path/to/storage"
        ));
    }
    // /.data -> .data stays relative, /tmp/data stays absolute
    Ok(if path.starts_with("/.") {
        &path[1..]
    } else {
        path
    })
}
