use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

use futures::future::try_join_all;
use futures::FutureExt;
use log::{debug, warn};
use serde_json::Value;

use super::instance::TaskInstance;
use crate::context::PipelineContext;
use crate::error::{TargetError, TaskError};

/// Upstream instances of a task, shaped like its dependency declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirements {
    List(Vec<TaskInstance>),
    Map(Vec<(String, TaskInstance)>),
}

impl Requirements {
    pub fn tasks(&self) -> Vec<&TaskInstance> {
        match self {
            Requirements::List(tasks) => tasks.iter().collect(),
            Requirements::Map(tasks) => tasks.iter().map(|(_, t)| t).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Requirements::List(tasks) => tasks.len(),
            Requirements::Map(tasks) => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<&TaskInstance> {
        match self {
            Requirements::List(_) => None,
            Requirements::Map(tasks) => tasks.iter().find(|(k, _)| k == name).map(|(_, t)| t),
        }
    }
}

/// Loaded outputs of the upstream tasks, in the same shape as [`Requirements`].
#[derive(Debug, Clone, PartialEq)]
pub enum Inputs {
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Inputs {
    pub fn len(&self) -> usize {
        match self {
            Inputs::List(values) => values.len(),
            Inputs::Map(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional access; works for both shapes.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Inputs::List(values) => values.get(index),
            Inputs::Map(values) => values.get(index).map(|(_, v)| v),
        }
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        match self {
            Inputs::List(_) => None,
            Inputs::Map(values) => values.iter().find(|(k, _)| k == name).map(|(_, v)| v),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Inputs::List(values) => values,
            Inputs::Map(values) => values.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

enum Sink {
    Stdout,
    File(File),
}

/// Where a computation writes its progress output. Goes to stdout unless the
/// run captures it for upload next to the task output.
pub struct TaskLog {
    sink: Mutex<Sink>,
}

impl TaskLog {
    pub fn stdout() -> Self {
        Self {
            sink: Mutex::new(Sink::Stdout),
        }
    }

    pub fn to_file(file: File) -> Self {
        Self {
            sink: Mutex::new(Sink::File(file)),
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(*self.lock(), Sink::File(_))
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        match &mut *self.lock() {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            Sink::File(file) => {
                file.write_all(text.as_bytes())?;
                file.flush()
            }
        }
    }

    pub fn line(&self, message: impl fmt::Display) -> io::Result<()> {
        self.write_str(&format!("{}\n", message))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TaskInstance {
    /// Load the outputs of every requirement, keeping the declared shape.
    pub async fn load_inputs(&self, ctx: &PipelineContext) -> Result<Inputs, TaskError> {
        match self.requires()? {
            Requirements::List(tasks) => {
                let values = try_join_all(tasks.iter().map(|t| t.load(ctx))).await?;
                Ok(Inputs::List(values))
            }
            Requirements::Map(tasks) => {
                let values = try_join_all(tasks.iter().map(|(_, t)| t.load(ctx))).await?;
                let names = tasks.into_iter().map(|(name, _)| name);
                Ok(Inputs::Map(names.zip(values).collect()))
            }
        }
    }

    /// Load inputs, run the computation and persist its result.
    ///
    /// With a cloud target and `persist_stdout`, the computation's log is
    /// captured in a temporary file and uploaded whether or not it succeeds.
    /// Computation errors come back untouched as [`TaskError::Computation`].
    pub async fn run(&self, ctx: &PipelineContext) -> Result<(), TaskError> {
        let inputs = self.load_inputs(ctx).await?;
        let target = self.output(ctx)?;
        let computation = self.definition().computation().clone();

        let output = if target.is_cloud_target() && self.definition().persist_stdout() {
            let log_file = tempfile::Builder::new()
                .prefix(&format!("{}-", self.task_id()))
                .suffix(".txt")
                .tempfile()
                .map_err(TargetError::Log)?;
            let log = TaskLog::to_file(log_file.reopen().map_err(TargetError::Log)?);

            let result = AssertUnwindSafe(computation.compute(self, inputs, &log))
                .catch_unwind()
                .await;
            drop(log);

            debug!("Uploading log of task '{}'", self.task_id());
            let persisted = target.persist_log(log_file.path()).await;
            match result {
                Ok(Ok(value)) => {
                    persisted?;
                    value
                }
                Ok(Err(e)) => {
                    if let Err(log_err) = persisted {
                        warn!("Couldn't upload log of task '{}': {}", self.task_id(), log_err);
                    }
                    return Err(TaskError::Computation(e));
                }
                Err(panic) => {
                    if let Err(log_err) = persisted {
                        warn!("Couldn't upload log of task '{}': {}", self.task_id(), log_err);
                    }
                    std::panic::resume_unwind(panic);
                }
            }
        } else {
            computation
                .compute(self, inputs, &TaskLog::stdout())
                .await
                .map_err(TaskError::Computation)?
        };

        target.dump(&output).await?;
        Ok(())
    }
}
