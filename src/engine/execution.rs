use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use super::task_state::TaskState;
use super::task_wrapper::TaskWrapper;
use crate::context::PipelineContext;
use crate::storage::StatusStore;

pub(crate) struct ExecutionEnvironment {
    /// Total number of tasks in the build
    pub task_count: usize,
    /// Shared state for task execution
    pub shared_state: BuildSharedState,
    /// Channel receiver for task settlement notifications
    pub completion_channel: mpsc::UnboundedReceiver<(String, TaskState)>,
}

#[derive(Clone)]
pub(crate) struct BuildSharedState {
    /// Build the status records belong to
    pub build_id: Arc<str>,
    /// Map of task IDs to task wrappers
    pub tasks: Arc<HashMap<String, TaskWrapper>>,
    /// Number of dependencies remaining for each task
    pub in_degree: Arc<Mutex<HashMap<String, usize>>>,
    /// Tasks that depend on each task
    pub dependents: Arc<HashMap<String, Vec<String>>>,
    /// Tasks that already reached a final state
    pub settled: Arc<Mutex<HashSet<String>>>,
    /// Channel sender for task settlement notifications
    pub completion_sender: mpsc::UnboundedSender<(String, TaskState)>,
    /// Storage backend for persisting task state
    pub storage: Arc<dyn StatusStore>,
    /// Targets, parameters and configuration the tasks run with
    pub context: Arc<PipelineContext>,
    /// Bounds the number of tasks running at once
    pub workers: Arc<Semaphore>,
}

impl BuildSharedState {
    /// Record that `task_id` reached `state`. Returns false if it already had.
    pub fn settle(&self, task_id: &str, state: TaskState) -> bool {
        let first = self
            .settled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(task_id.to_string());
        if first {
            let _ = self.completion_sender.send((task_id.to_string(), state));
        }
        first
    }
}
