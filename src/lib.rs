//! # Carol Pipeline
//!
//! Parameterized, composable pipeline tasks with pluggable output targets,
//! a local build driver and a client for the platform's data model views.
//!
//! ## Features
//!
//! - Declare tasks as immutable definitions with typed parameters
//! - Compose tasks with `inherit_list` / `inherit_dict`, taking over upstream
//!   parameters so one invocation parameterizes a whole chain
//! - Stable task identifiers derived from significant parameter values
//! - Outputs in JSON or CBOR, on the local disk or in an S3 bucket
//! - Capture of a task's log next to its cloud output
//! - Local builds with bounded parallelism, retries and status persistence
//! - Graph data of a pipeline for plotting front-ends
//! - Listing, export control and retrieval of data model views
//!
//! ## Example
//!
//! ```rust,no_run
//! use carol_pipeline::storage::MemoryStorage;
//! use carol_pipeline::task::{from_fn, kwargs, Parameter, TaskDefinition};
//! use carol_pipeline::{Pipeline, PipelineConfig, PipelineContext};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let extract = TaskDefinition::builder("Extract")
//!         .param("date", Parameter::str())
//!         .computation(from_fn(|task, _inputs, _log| Ok(json!({ "date": task.param("date") }))))
//!         .build();
//!     let summary = TaskDefinition::builder("Summary")
//!         .inherit_list([&extract])
//!         .build();
//!
//!     let context = Arc::new(PipelineContext::new(PipelineConfig::from_env())?);
//!     let root = context.instantiate(&summary, kwargs([("date", json!("2024-01-01"))]))?;
//!
//!     let report = Pipeline::new("daily", context, Arc::new(MemoryStorage::new()))
//!         .add_task(root)
//!         .build()
//!         .await?;
//!     assert!(report.success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod data_models;
pub mod engine;
pub mod error;
pub mod storage;
pub mod target;
pub mod task;

pub use config::{CloudConfig, ParamConfig, PipelineConfig};
pub use context::PipelineContext;
pub use data_models::{CarolApi, DataModelView};
pub use engine::{BuildOptions, BuildReport, Pipeline, PipelineGraph, TaskState};
pub use error::{BoxError, DataModelError, ParamError, TargetError, TaskError};
pub use storage::StatusStore;
pub use target::{Target, TargetKind};
pub use task::{
    inherit_dict, inherit_list, Computation, RetryPolicy, TaskBuilder, TaskDefinition,
    TaskInstance,
};
