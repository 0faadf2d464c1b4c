use std::error::Error;

pub mod implementations;
pub mod objects;
pub use implementations::*;
pub use objects::{create_cloud_store, LocalStore, MemoryStore, ObjectStore};

use crate::TaskState;

/// Records the state of every task taking part in a build.
#[async_trait::async_trait]
pub trait StatusStore: Send + Sync {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn create_task_record(
        &self,
        build_id: &str,
        task_id: &str,
        family: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn update_task_state(
        &self,
        build_id: &str,
        task_id: &str,
        state: TaskState,
        attempts: usize,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_build_status(
        &self,
        build_id: &str,
    ) -> Result<Vec<(String, TaskState, usize)>, Box<dyn Error + Send + Sync>>;
}
