use log::{debug, error, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use super::dependency::DependencyGraph;
use super::execution::{BuildSharedState, ExecutionEnvironment};
use super::executor::TaskExecutor;
use super::graph::{NodesData, PipelineGraph};
use super::options::BuildOptions;
use super::task_state::TaskState;
use crate::context::PipelineContext;
use crate::error::{BoxError, TaskError};
use crate::storage::StatusStore;
use crate::task::TaskInstance;

/// Final state of every task a build touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub build_id: String,
    pub states: BTreeMap<String, TaskState>,
}

impl BuildReport {
    /// True when nothing failed.
    pub fn success(&self) -> bool {
        self.states.values().all(TaskState::is_success)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, state)| **state == TaskState::Failed)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn state_of(&self, task_id: &str) -> Option<TaskState> {
        self.states.get(task_id).copied()
    }
}

/// Builds root task instances locally, requirements first.
pub struct Pipeline {
    /// Unique identifier for the build
    build_id: String,
    /// Tasks the build must produce
    roots: Vec<TaskInstance>,
    /// Targets, parameters and configuration shared by every task
    context: Arc<PipelineContext>,
    /// Storage backend for persisting task state
    storage: Arc<dyn StatusStore>,
    options: BuildOptions,
}

impl Pipeline {
    pub fn new(
        build_id: impl Into<String>,
        context: Arc<PipelineContext>,
        storage: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            build_id: build_id.into(),
            roots: Vec::new(),
            context,
            storage,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a root task. Adding the same task twice has no effect.
    pub fn add_task(mut self, task: TaskInstance) -> Self {
        if !self.roots.contains(&task) {
            self.roots.push(task);
        }
        self
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    pub fn roots(&self) -> &[TaskInstance] {
        &self.roots
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    /// Run every incomplete task the roots need. Tasks whose output already
    /// exists are skipped along with their requirements.
    pub async fn build(&self) -> Result<BuildReport, BoxError> {
        debug!(
            "Building '{}' with {} root tasks",
            self.build_id,
            self.roots.len()
        );

        let dependency_graph = DependencyGraph::expand(
            &self.roots,
            &self.context,
            self.options.retry_policy,
            true,
        )
        .await?;

        self.initialize_storage_records(&dependency_graph).await?;

        let execution_env = self.setup_execution_environment(dependency_graph);

        let executor = TaskExecutor::new(execution_env.shared_state.clone());
        self.spawn_initial_tasks(&execution_env.shared_state, &executor);
        drop(executor);

        let states = self.wait_for_completion(execution_env).await;

        let report = BuildReport {
            build_id: self.build_id.clone(),
            states,
        };
        if report.success() {
            info!("Build '{}' succeeded", self.build_id);
        } else {
            info!(
                "Build '{}' finished with {} failed tasks",
                self.build_id,
                report.failed().len()
            );
        }
        Ok(report)
    }

    async fn initialize_storage_records(
        &self,
        dependency_graph: &DependencyGraph,
    ) -> Result<(), BoxError> {
        debug!("Initializing storage records for build '{}'", self.build_id);

        for task_id in &dependency_graph.order {
            let family = dependency_graph.tasks[task_id].task.family();
            self.storage
                .create_task_record(&self.build_id, task_id, family)
                .await?
        }

        Ok(())
    }

    fn setup_execution_environment(&self, dependency_graph: DependencyGraph) -> ExecutionEnvironment {
        debug!(
            "Setting up execution environment for build '{}'",
            self.build_id
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let task_count = dependency_graph.tasks.len();

        let shared_state = BuildSharedState {
            build_id: Arc::from(self.build_id.as_str()),
            tasks: Arc::new(dependency_graph.tasks),
            in_degree: Arc::new(Mutex::new(dependency_graph.in_degree)),
            dependents: Arc::new(dependency_graph.dependents),
            settled: Arc::new(Mutex::new(HashSet::new())),
            completion_sender: tx,
            storage: self.storage.clone(),
            context: self.context.clone(),
            workers: Arc::new(Semaphore::new(self.options.workers)),
        };

        ExecutionEnvironment {
            task_count,
            shared_state,
            completion_channel: rx,
        }
    }

    fn spawn_initial_tasks(&self, shared_state: &BuildSharedState, executor: &TaskExecutor) {
        debug!("Spawning initial tasks for build '{}'", self.build_id);

        let tasks_to_spawn: Vec<String> = {
            let in_degree_lock = shared_state
                .in_degree
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            in_degree_lock
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(id, _)| id.clone())
                .collect()
        };

        info!("Spawning {} initial tasks", tasks_to_spawn.len());

        for task_id in tasks_to_spawn {
            executor.spawn_task(task_id);
        }
    }

    async fn wait_for_completion(
        &self,
        execution_env: ExecutionEnvironment,
    ) -> BTreeMap<String, TaskState> {
        let ExecutionEnvironment {
            task_count,
            shared_state,
            completion_channel: mut rx,
        } = execution_env;
        let task_ids: Vec<String> = shared_state.tasks.keys().cloned().collect();
        // Only the spawned tasks hold senders from here on, so the channel
        // closes if one of them dies without settling.
        drop(shared_state);

        debug!("Waiting for {} tasks to settle", task_count);

        let mut states = BTreeMap::new();
        if task_count == 0 {
            return states;
        }
        while let Some((task_id, state)) = rx.recv().await {
            info!("Build: task '{}' is {}", task_id, state);
            states.insert(task_id, state);

            debug!("Progress: {}/{} tasks settled", states.len(), task_count);

            if states.len() == task_count {
                break;
            }
        }

        for task_id in task_ids {
            states.entry(task_id).or_insert_with_key(|id| {
                error!("Task '{}' never settled", id);
                TaskState::Failed
            });
        }

        debug!("All tasks settled for build '{}'", self.build_id);
        states
    }

    pub async fn get_status(&self) -> Result<HashMap<String, TaskState>, BoxError> {
        let status = self.storage.get_build_status(&self.build_id).await?;

        let mut result = HashMap::new();
        for (id, state, _) in status {
            result.insert(id, state);
        }

        Ok(result)
    }

    async fn full_graph(&self) -> Result<DependencyGraph, TaskError> {
        DependencyGraph::expand(
            &self.roots,
            &self.context,
            self.options.retry_policy,
            false,
        )
        .await
    }

    /// Node and edge data of every task reachable from the roots.
    pub async fn graph(&self) -> Result<PipelineGraph, TaskError> {
        Ok(PipelineGraph::from_dependency_graph(&self.full_graph().await?))
    }

    /// Look a task up among the roots and their transitive requirements.
    pub async fn get_task_by_id(&self, task_id: &str) -> Result<Option<TaskInstance>, TaskError> {
        let graph = self.full_graph().await?;
        Ok(graph.tasks.get(task_id).map(|wrapper| wrapper.task.clone()))
    }

    pub async fn complete(&self, task: &TaskInstance) -> Result<bool, TaskError> {
        Ok(task.complete(&self.context).await?)
    }

    /// Remove the output of a single task.
    pub async fn remove(&self, task: &TaskInstance) -> Result<(), TaskError> {
        info!("Removing output of task '{}'", task.task_id());
        task.remove(&self.context).await?;
        Ok(())
    }

    /// Remove the outputs of `tasks` and of everything they transitively
    /// require. Returns the ids whose outputs were removed.
    pub async fn remove_upstream(&self, tasks: &[TaskInstance]) -> Result<Vec<String>, TaskError> {
        let graph =
            DependencyGraph::expand(tasks, &self.context, self.options.retry_policy, false).await?;

        let mut removed = Vec::new();
        for task in tasks {
            for id in graph.upstream_of(task.task_id()) {
                if removed.contains(&id) {
                    continue;
                }
                if let Some(wrapper) = graph.tasks.get(&id) {
                    self.remove(&wrapper.task).await?;
                    removed.push(id);
                }
            }
        }
        Ok(removed)
    }

    /// Run one task in place, assuming its requirements are complete.
    pub async fn run_task(&self, task: &TaskInstance) -> Result<(), TaskError> {
        info!("Running task '{}'", task.task_id());
        task.run(&self.context).await
    }

    /// Recompute the `complete` column. Returns whether anything changed.
    pub async fn refresh_complete(&self, nodes: &mut NodesData) -> Result<bool, TaskError> {
        let graph = self.full_graph().await?;
        let mut changed = false;
        for (idx, task_id) in nodes.task_id.iter().enumerate() {
            let Some(wrapper) = graph.tasks.get(task_id) else {
                continue;
            };
            let complete = wrapper.complete;
            if let Some(slot) = nodes.complete.get_mut(idx) {
                if *slot != complete {
                    *slot = complete;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}
