use std::sync::Arc;
use std::time::Duration;

use carol_pipeline::storage::SqliteStorage;
use carol_pipeline::task::{example_task, kwargs};
use carol_pipeline::{
    BuildOptions, ParamConfig, Pipeline, PipelineConfig, PipelineContext, RetryPolicy,
    StatusStore,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();
    println!("Starting the Carol pipeline demo...");

    // Step 1: Set up the status store.
    let storage = Arc::new(SqliteStorage::new("sqlite:builds.db?mode=rwc").await?);
    storage.init().await?;

    // Step 2: Targets and externally configured parameters.
    let config = PipelineConfig::from_env();
    let params = ParamConfig::from_env().with("demo.Extract", "rows", json!("5"));
    let context = Arc::new(PipelineContext::new(config)?.with_params(params));

    // Step 3: Define the tasks and pick the root.
    let extract = example_task::extract();
    let transform = example_task::transform(&extract);
    let report = example_task::report(&extract, &transform);
    let root = context.instantiate(&report, kwargs([("date", json!("2024-01-01"))]))?;
    println!("Building {} ({})", root, root.task_id());

    // Step 4: Build it.
    let pipeline = Pipeline::new("demo", context.clone(), storage.clone())
        .with_options(
            BuildOptions::new().with_workers(2).with_retry_policy(
                RetryPolicy::default()
                    .with_max_retries(1)
                    .with_retry_delay(Duration::from_millis(500)),
            ),
        )
        .add_task(root.clone());
    let build = pipeline.build().await?;

    // Step 5: Report.
    println!("Build status:");
    for (id, state, attempts) in storage.get_build_status("demo").await? {
        println!("  Task {}: {} after {} attempt(s)", id, state, attempts);
    }
    if build.success() {
        println!("Result: {}", root.load(&context).await?);
    } else {
        eprintln!("Failed tasks: {:?}", build.failed());
    }

    Ok(())
}
