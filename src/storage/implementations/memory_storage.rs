use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::TaskState;
use crate::storage::StatusStore;

type Records = HashMap<(String, String), (String, TaskState, usize)>;

/// In-memory implementation of StatusStore, handy for tests and one-off builds
#[derive(Clone, Default)]
pub struct MemoryStorage {
    /// (build id, task id) -> (family, state, attempts)
    task_states: Arc<Mutex<Records>>,
    update_calls: Arc<Mutex<Vec<(String, TaskState, usize)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state of a task within a build
    pub fn get_task_state(&self, build_id: &str, task_id: &str) -> Option<(TaskState, usize)> {
        lock(&self.task_states)
            .get(&(build_id.to_string(), task_id.to_string()))
            .map(|(_, state, attempts)| (*state, *attempts))
    }

    /// Get all update calls made to this storage, in order
    pub fn get_update_calls(&self) -> Vec<(String, TaskState, usize)> {
        lock(&self.update_calls).clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStorage {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }

    async fn create_task_record(
        &self,
        build_id: &str,
        task_id: &str,
        family: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        lock(&self.task_states).insert(
            (build_id.to_string(), task_id.to_string()),
            (family.to_string(), TaskState::Pending, 0),
        );
        Ok(())
    }

    async fn update_task_state(
        &self,
        build_id: &str,
        task_id: &str,
        state: TaskState,
        attempts: usize,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        lock(&self.update_calls).push((task_id.to_string(), state, attempts));

        let mut states = lock(&self.task_states);
        match states.get_mut(&(build_id.to_string(), task_id.to_string())) {
            Some(record) => {
                record.1 = state;
                record.2 = attempts;
                Ok(())
            }
            None => Err(format!("Task '{}' not found in build '{}'", task_id, build_id).into()),
        }
    }

    async fn get_build_status(
        &self,
        build_id: &str,
    ) -> Result<Vec<(String, TaskState, usize)>, Box<dyn Error + Send + Sync>> {
        let states = lock(&self.task_states);
        let mut result: Vec<_> = states
            .iter()
            .filter(|((bid, _), _)| bid == build_id)
            .map(|((_, id), (_, state, attempts))| (id.clone(), *state, *attempts))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(result)
    }
}

mod tests;
