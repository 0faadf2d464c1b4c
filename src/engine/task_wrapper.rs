use crate::task::{RetryPolicy, TaskInstance};

#[derive(Clone)]
pub(crate) struct TaskWrapper {
    /// The task instance to run
    pub task: TaskInstance,
    /// IDs of tasks that this task depends on, without duplicates
    pub dependencies: Vec<String>,
    /// Policy for retrying the task on failure
    pub retry_policy: RetryPolicy,
    /// Output existed when the graph was expanded
    pub complete: bool,
}
