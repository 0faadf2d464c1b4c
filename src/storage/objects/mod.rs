//! Blob stores backing task outputs.

mod local;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use local::LocalStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::CloudConfig;
pub use crate::error::StoreError;

/// Where targets keep their encoded outputs and task logs. Keys look like
/// `<family>/<task_id>.<ext>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite. A reader never observes a partially written object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// `StoreError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    async fn get_opt(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match self.get(key).await {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Existence of the output is what makes a task complete.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether objects live outside the local machine.
    fn is_remote(&self) -> bool {
        false
    }
}

/// Create the store used by cloud targets, if one is configured.
pub fn create_cloud_store(config: &CloudConfig) -> Result<Option<Arc<dyn ObjectStore>>, StoreError> {
    if !config.is_configured() {
        return Ok(None);
    }
    #[cfg(feature = "s3")]
    {
        Ok(Some(Arc::new(S3Store::new(config)?)))
    }
    #[cfg(not(feature = "s3"))]
    {
        Err(StoreError::Internal(
            "S3 configuration detected but the 's3' feature is not enabled".into(),
        ))
    }
}

mod tests;
