use std::collections::{HashMap, VecDeque};

use log::debug;

use super::task_wrapper::TaskWrapper;
use crate::context::PipelineContext;
use crate::error::TaskError;
use crate::task::{RetryPolicy, TaskInstance};

pub(crate) struct DependencyGraph {
    /// Tasks by id
    pub tasks: HashMap<String, TaskWrapper>,
    /// Task ids in discovery order, roots first
    pub order: Vec<String>,
    /// Number of dependencies for each task
    pub in_degree: HashMap<String, usize>,
    /// Tasks that depend on each task
    pub dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Walk the requirements of `roots`, merging instances with equal ids.
    ///
    /// With `prune_complete`, tasks whose output exists are not expanded further.
    pub async fn expand(
        roots: &[TaskInstance],
        ctx: &PipelineContext,
        default_retry: RetryPolicy,
        prune_complete: bool,
    ) -> Result<Self, TaskError> {
        let mut tasks: HashMap<String, TaskWrapper> = HashMap::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<TaskInstance> = roots.iter().cloned().collect();

        while let Some(task) = queue.pop_front() {
            if tasks.contains_key(task.task_id()) {
                continue;
            }
            let complete = task.complete(ctx).await?;

            let mut dependencies: Vec<String> = Vec::new();
            if !(complete && prune_complete) {
                for upstream in task.requires()?.tasks() {
                    if !dependencies.iter().any(|id| id == upstream.task_id()) {
                        dependencies.push(upstream.task_id().to_string());
                    }
                    queue.push_back(upstream.clone());
                }
            }

            debug!(
                "Discovered task '{}' (complete: {}, {} dependencies)",
                task.task_id(),
                complete,
                dependencies.len()
            );
            let retry_policy = task.definition().retry_policy().unwrap_or(default_retry);
            order.push(task.task_id().to_string());
            tasks.insert(
                task.task_id().to_string(),
                TaskWrapper {
                    task,
                    dependencies,
                    retry_policy,
                    complete,
                },
            );
        }

        let in_degree: HashMap<String, usize> = tasks
            .iter()
            .map(|(id, wrapper)| (id.clone(), wrapper.dependencies.len()))
            .collect();

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for id in &order {
            for dep in &tasks[id].dependencies {
                dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        Ok(Self {
            tasks,
            order,
            in_degree,
            dependents,
        })
    }

    /// Ids of `task_id` and of everything it transitively depends on.
    pub fn upstream_of(&self, task_id: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut stack = vec![task_id.to_string()];
        while let Some(id) = stack.pop() {
            if seen.contains(&id) {
                continue;
            }
            if let Some(wrapper) = self.tasks.get(&id) {
                stack.extend(wrapper.dependencies.iter().cloned());
            }
            seen.push(id);
        }
        seen
    }
}
