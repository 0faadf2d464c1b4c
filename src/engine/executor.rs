use log::{error, info};
use tokio::time::sleep;

use super::execution::BuildSharedState;
use super::task_state::TaskState;
use super::task_wrapper::TaskWrapper;
use crate::storage::StatusStore;

pub struct TaskExecutor {
    shared_state: BuildSharedState,
}

impl TaskExecutor {
    pub(crate) fn new(shared_state: BuildSharedState) -> Self {
        Self { shared_state }
    }

    pub fn spawn_task(&self, task_id: String) {
        let shared_state = self.shared_state.clone();

        tokio::spawn(async move {
            let wrapper = match shared_state.tasks.get(&task_id) {
                Some(w) => w.clone(),
                None => {
                    error!("Task '{}' not found in build", task_id);
                    return;
                }
            };

            let state = if wrapper.complete {
                info!("Task '{}' is already complete, skipping", task_id);
                if let Err(e) = shared_state
                    .storage
                    .update_task_state(
                        &shared_state.build_id,
                        &task_id,
                        TaskState::Skipped,
                        0,
                    )
                    .await
                {
                    error!("Error updating state for task '{}': {}", task_id, e);
                }
                TaskState::Skipped
            } else {
                let _permit = match shared_state.workers.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed before task '{}' ran: {}", task_id, e);
                        return;
                    }
                };
                Self::execute_task_with_retry(&task_id, &wrapper, &shared_state).await
            };

            shared_state.settle(&task_id, state);

            Self::process_dependent_tasks(task_id, shared_state, state.is_success()).await;
        });
    }

    async fn execute_task_with_retry(
        task_id: &str,
        wrapper: &TaskWrapper,
        shared_state: &BuildSharedState,
    ) -> TaskState {
        let build_id: &str = &shared_state.build_id;
        let storage = &shared_state.storage;
        let mut attempts = 0;
        let max_attempts = wrapper.retry_policy.max_attempts();

        loop {
            attempts += 1;
            info!(
                "Task '{}' starting (attempt {}/{})",
                task_id, attempts, max_attempts
            );

            if let Err(e) = storage
                .update_task_state(build_id, task_id, TaskState::Running, attempts)
                .await
            {
                error!("Error updating state for task '{}': {}", task_id, e);
            }

            match wrapper.task.run(&shared_state.context).await {
                Ok(()) => {
                    info!("Task '{}' completed successfully", task_id);
                    if let Err(e) = storage
                        .update_task_state(build_id, task_id, TaskState::Completed, attempts)
                        .await
                    {
                        error!("Error updating state for task '{}': {}", task_id, e);
                    }
                    return TaskState::Completed;
                }
                Err(e) => {
                    error!("Task '{}' failed on attempt {}: {}", task_id, attempts, e);

                    if attempts < max_attempts {
                        info!(
                            "Retrying task '{}' after {:?}",
                            task_id, wrapper.retry_policy.retry_delay
                        );
                        sleep(wrapper.retry_policy.retry_delay).await;
                    } else {
                        error!("Task '{}' failed after {} attempts", task_id, attempts);
                        if let Err(e) = storage
                            .update_task_state(build_id, task_id, TaskState::Failed, attempts)
                            .await
                        {
                            error!("Error updating state for task '{}': {}", task_id, e);
                        }
                        return TaskState::Failed;
                    }
                }
            }
        }
    }

    async fn process_dependent_tasks(
        settled_task_id: String,
        shared_state: BuildSharedState,
        success: bool,
    ) {
        if !success {
            Self::mark_downstream_tasks_as_failed(&settled_task_id, &shared_state).await;
            return;
        }

        let mut dependent_tasks_ready = Vec::new();

        if let Some(dependent_tasks) = shared_state.dependents.get(&settled_task_id) {
            for dependent_id in dependent_tasks {
                let is_ready = {
                    let mut degree_lock = shared_state
                        .in_degree
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if let Some(count) = degree_lock.get_mut(dependent_id) {
                        *count -= 1;
                        *count == 0
                    } else {
                        false
                    }
                };

                if is_ready {
                    dependent_tasks_ready.push(dependent_id.clone());
                }
            }
        }

        let executor = TaskExecutor::new(shared_state);
        for task_id in dependent_tasks_ready {
            executor.spawn_task(task_id);
        }
    }

    async fn mark_downstream_tasks_as_failed(failed_task_id: &str, shared_state: &BuildSharedState) {
        let mut stack = vec![failed_task_id.to_string()];
        while let Some(upstream_id) = stack.pop() {
            let Some(dependent_tasks) = shared_state.dependents.get(&upstream_id) else {
                continue;
            };
            for dependent_id in dependent_tasks {
                // Reachable through several failed paths; handle it once.
                if !shared_state.settle(dependent_id, TaskState::Failed) {
                    continue;
                }
                info!(
                    "Marking task '{}' as failed because it depends on failed task '{}'",
                    dependent_id, upstream_id
                );

                if let Err(e) = shared_state
                    .storage
                    .update_task_state(
                        &shared_state.build_id,
                        dependent_id,
                        TaskState::Failed,
                        0,
                    )
                    .await
                {
                    error!(
                        "Error updating state for dependent task '{}': {}",
                        dependent_id, e
                    );
                }

                stack.push(dependent_id.clone());
            }
        }
    }
}

mod tests;
