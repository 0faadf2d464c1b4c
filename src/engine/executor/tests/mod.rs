#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::PipelineConfig;
    use crate::context::PipelineContext;
    use crate::engine::execution::BuildSharedState;
    use crate::engine::task_state::TaskState;
    use crate::engine::task_wrapper::TaskWrapper;
    use crate::error::BoxError;
    use crate::storage::{MemoryStorage, MemoryStore, StatusStore};
    use crate::task::{
        Computation, Inputs, Kwargs, RetryPolicy, TaskDefinition, TaskInstance, TaskLog,
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::{mpsc, Semaphore};

    // Computation that counts its runs and optionally fails
    #[derive(Clone)]
    struct MockComputation {
        should_fail: bool,
        execution_count: Arc<AtomicUsize>,
        execution_delay: Duration,
    }

    impl MockComputation {
        fn new(should_fail: bool) -> Self {
            Self {
                should_fail,
                execution_count: Arc::new(AtomicUsize::new(0)),
                execution_delay: Duration::from_millis(10),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.execution_delay = delay;
            self
        }

        fn get_execution_count(&self) -> usize {
            self.execution_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Computation for MockComputation {
        async fn compute(
            &self,
            task: &TaskInstance,
            _inputs: Inputs,
            _log: &TaskLog,
        ) -> Result<Value, BoxError> {
            self.execution_count.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.execution_delay).await;

            if self.should_fail {
                Err(format!("Task {} failed deliberately", task.family()).into())
            } else {
                Ok(json!({ "done": task.family() }))
            }
        }
    }

    struct TestTask {
        family: &'static str,
        computation: MockComputation,
        dependencies: Vec<&'static str>,
        retry_policy: Option<RetryPolicy>,
        complete: bool,
    }

    fn task(family: &'static str, computation: MockComputation) -> TestTask {
        TestTask {
            family,
            computation,
            dependencies: vec![],
            retry_policy: None,
            complete: false,
        }
    }

    impl TestTask {
        fn after(mut self, dependencies: Vec<&'static str>) -> Self {
            self.dependencies = dependencies;
            self
        }

        fn retry(mut self, policy: RetryPolicy) -> Self {
            self.retry_policy = Some(policy);
            self
        }

        fn already_complete(mut self) -> Self {
            self.complete = true;
            self
        }
    }

    struct Harness {
        executor: TaskExecutor,
        storage: Arc<MemoryStorage>,
        rx: mpsc::UnboundedReceiver<(String, TaskState)>,
        /// family -> task id
        ids: HashMap<&'static str, String>,
    }

    // Builds shared state by hand; dependencies are given by family
    async fn create_build_with_tasks(tasks: Vec<TestTask>, workers: usize) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let context = Arc::new(PipelineContext::with_stores(
            PipelineConfig::default(),
            Arc::new(MemoryStore::new()),
            None,
        ));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut ids = HashMap::new();
        let mut instances = Vec::new();
        for t in &tasks {
            let definition = TaskDefinition::builder(t.family)
                .computation(t.computation.clone())
                .build();
            let instance = TaskInstance::new(&definition, Kwargs::new()).expect("no params");
            ids.insert(t.family, instance.task_id().to_string());
            instances.push(instance);
        }

        let mut task_map = HashMap::new();
        let mut in_degree_map = HashMap::new();
        let mut dependents_map: HashMap<String, Vec<String>> = HashMap::new();
        for (t, instance) in tasks.into_iter().zip(instances) {
            let id = instance.task_id().to_string();
            let dependencies: Vec<String> =
                t.dependencies.iter().map(|f| ids[f].clone()).collect();
            for dep in &dependencies {
                dependents_map.entry(dep.clone()).or_default().push(id.clone());
            }
            in_degree_map.insert(id.clone(), dependencies.len());

            storage
                .create_task_record("test_build", &id, t.family)
                .await
                .expect("record");

            task_map.insert(
                id,
                TaskWrapper {
                    task: instance,
                    dependencies,
                    retry_policy: t.retry_policy.unwrap_or_default(),
                    complete: t.complete,
                },
            );
        }

        let shared_state = BuildSharedState {
            build_id: Arc::from("test_build"),
            tasks: Arc::new(task_map),
            in_degree: Arc::new(Mutex::new(in_degree_map)),
            dependents: Arc::new(dependents_map),
            settled: Arc::new(Mutex::new(HashSet::new())),
            completion_sender: tx,
            storage: storage.clone(),
            context,
            workers: Arc::new(Semaphore::new(workers)),
        };

        Harness {
            executor: TaskExecutor::new(shared_state),
            storage,
            rx,
            ids,
        }
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<(String, TaskState)>, n: usize) -> Vec<(String, TaskState)> {
        let mut settled = Vec::new();
        for _ in 0..n {
            settled.push(rx.recv().await.expect("Should receive settlement"));
        }
        settled
    }

    #[tokio::test]
    async fn test_successful_task_execution() {
        let computation = MockComputation::new(false);
        let mut h = create_build_with_tasks(vec![task("Single", computation.clone())], 1).await;
        let id = h.ids["Single"].clone();

        h.executor.spawn_task(id.clone());

        let settled = collect(&mut h.rx, 1).await;
        assert_eq!(settled, vec![(id.clone(), TaskState::Completed)]);
        assert_eq!(computation.get_execution_count(), 1);

        let state = h
            .storage
            .get_task_state("test_build", &id)
            .expect("Task state should exist");
        assert_eq!(state, (TaskState::Completed, 1));
    }

    #[tokio::test]
    async fn test_retry_on_failure() {
        let computation = MockComputation::new(true);
        let policy = RetryPolicy::default()
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(20));
        let mut h =
            create_build_with_tasks(vec![task("Flaky", computation.clone()).retry(policy)], 1)
                .await;
        let id = h.ids["Flaky"].clone();

        h.executor.spawn_task(id.clone());

        let settled = collect(&mut h.rx, 1).await;
        assert_eq!(settled[0].1, TaskState::Failed);
        // initial attempt plus two retries
        assert_eq!(computation.get_execution_count(), 3);

        let state = h
            .storage
            .get_task_state("test_build", &id)
            .expect("Task state should exist");
        assert_eq!(state, (TaskState::Failed, 3));
    }

    #[tokio::test]
    async fn test_dependent_task_execution() {
        let first = MockComputation::new(false);
        let second = MockComputation::new(false);
        let mut h = create_build_with_tasks(
            vec![
                task("First", first.clone()),
                task("Second", second.clone()).after(vec!["First"]),
            ],
            2,
        )
        .await;

        h.executor.spawn_task(h.ids["First"].clone());

        let settled = collect(&mut h.rx, 2).await;
        assert_eq!(settled[0].0, h.ids["First"]);
        assert_eq!(settled[1].0, h.ids["Second"]);
        assert_eq!(first.get_execution_count(), 1);
        assert_eq!(second.get_execution_count(), 1);

        // The output of a finished task lands in its target
        let output = h.executor.shared_state.tasks[&h.ids["Second"]]
            .task
            .load(&h.executor.shared_state.context)
            .await
            .expect("output");
        assert_eq!(output, json!({ "done": "Second" }));
    }

    #[tokio::test]
    async fn test_failed_dependency_marks_downstream_as_failed() {
        let first = MockComputation::new(false);
        let broken = MockComputation::new(true);
        let last = MockComputation::new(false);
        let mut h = create_build_with_tasks(
            vec![
                task("First", first.clone()),
                task("Broken", broken.clone()).after(vec!["First"]),
                task("Last", last.clone()).after(vec!["Broken"]),
            ],
            1,
        )
        .await;

        h.executor.spawn_task(h.ids["First"].clone());

        let settled: HashMap<_, _> = collect(&mut h.rx, 3).await.into_iter().collect();
        assert_eq!(settled[&h.ids["First"]], TaskState::Completed);
        assert_eq!(settled[&h.ids["Broken"]], TaskState::Failed);
        assert_eq!(settled[&h.ids["Last"]], TaskState::Failed);

        assert_eq!(broken.get_execution_count(), 1);
        assert_eq!(last.get_execution_count(), 0);

        let state = h
            .storage
            .get_task_state("test_build", &h.ids["Last"])
            .expect("state");
        assert_eq!(state, (TaskState::Failed, 0));
    }

    #[tokio::test]
    async fn test_downstream_failure_reported_once() {
        //   A
        //  / \
        // B   C
        //  \ /
        //   D
        // A fails; D is reachable through B and C.
        let mut h = create_build_with_tasks(
            vec![
                task("A", MockComputation::new(true)),
                task("B", MockComputation::new(false)).after(vec!["A"]),
                task("C", MockComputation::new(false)).after(vec!["A"]),
                task("D", MockComputation::new(false)).after(vec!["B", "C"]),
            ],
            2,
        )
        .await;

        h.executor.spawn_task(h.ids["A"].clone());

        let settled = collect(&mut h.rx, 4).await;
        assert!(settled.iter().all(|(_, state)| *state == TaskState::Failed));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.rx.try_recv().is_err());

        let d_updates = h
            .storage
            .get_update_calls()
            .into_iter()
            .filter(|(id, _, _)| *id == h.ids["D"])
            .count();
        assert_eq!(d_updates, 1);
    }

    #[tokio::test]
    async fn test_complete_task_is_skipped() {
        let done = MockComputation::new(false);
        let next = MockComputation::new(false);
        let mut h = create_build_with_tasks(
            vec![
                task("Done", done.clone()).already_complete(),
                task("Next", next.clone()).after(vec!["Done"]),
            ],
            1,
        )
        .await;

        h.executor.spawn_task(h.ids["Done"].clone());

        let settled: HashMap<_, _> = collect(&mut h.rx, 2).await.into_iter().collect();
        assert_eq!(settled[&h.ids["Done"]], TaskState::Skipped);
        assert_eq!(settled[&h.ids["Next"]], TaskState::Completed);
        assert_eq!(done.get_execution_count(), 0);
        assert_eq!(next.get_execution_count(), 1);
    }

    #[tokio::test]
    async fn test_worker_limit_serializes_tasks() {
        let delay = Duration::from_millis(50);
        let mut h = create_build_with_tasks(
            vec![
                task("Left", MockComputation::new(false).with_delay(delay)),
                task("Right", MockComputation::new(false).with_delay(delay)),
            ],
            1,
        )
        .await;

        let start = std::time::Instant::now();
        h.executor.spawn_task(h.ids["Left"].clone());
        h.executor.spawn_task(h.ids["Right"].clone());
        collect(&mut h.rx, 2).await;

        assert!(start.elapsed() >= delay * 2);
    }

    #[tokio::test]
    async fn test_async_execution_ordering() {
        let mut h = create_build_with_tasks(
            vec![
                task(
                    "Fast",
                    MockComputation::new(false).with_delay(Duration::from_millis(10)),
                ),
                task(
                    "Slow",
                    MockComputation::new(false).with_delay(Duration::from_millis(100)),
                ),
                task("Dependent", MockComputation::new(false)).after(vec!["Fast", "Slow"]),
            ],
            2,
        )
        .await;

        let start = std::time::Instant::now();
        h.executor.spawn_task(h.ids["Fast"].clone());
        h.executor.spawn_task(h.ids["Slow"].clone());

        let settled = collect(&mut h.rx, 3).await;
        assert_eq!(settled[2].0, h.ids["Dependent"]);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
