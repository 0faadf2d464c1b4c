use async_trait::async_trait;
use serde_json::Value;

pub mod definition;
pub mod example_task;
pub mod identity;
pub mod inherit;
pub mod instance;
pub mod param;
pub mod run;

mod retry {
    pub mod policy;
}

pub use definition::{Dependency, Requires, TaskBuilder, TaskDefinition};
pub use inherit::{inherit_dict, inherit_list};
pub use instance::TaskInstance;
pub use param::{get_param_values, kwargs, Binding, Kwargs, ParamKind, Parameter};
pub use retry::policy::RetryPolicy;
pub use run::{Inputs, Requirements, TaskLog};

use crate::error::BoxError;

/// The user logic of a task: turns the loaded outputs of its dependencies into
/// its own output.
#[async_trait]
pub trait Computation: Send + Sync {
    async fn compute(
        &self,
        task: &TaskInstance,
        inputs: Inputs,
        log: &TaskLog,
    ) -> Result<Value, BoxError>;
}

/// Computation of tasks that don't define one. Produces `null`.
pub struct NoopComputation;

#[async_trait]
impl Computation for NoopComputation {
    async fn compute(
        &self,
        _task: &TaskInstance,
        _inputs: Inputs,
        _log: &TaskLog,
    ) -> Result<Value, BoxError> {
        Ok(Value::Null)
    }
}

/// Adapter for synchronous closures, see [`from_fn`].
pub struct FnComputation<F>(F);

#[async_trait]
impl<F> Computation for FnComputation<F>
where
    F: Fn(&TaskInstance, Inputs, &TaskLog) -> Result<Value, BoxError> + Send + Sync,
{
    async fn compute(
        &self,
        task: &TaskInstance,
        inputs: Inputs,
        log: &TaskLog,
    ) -> Result<Value, BoxError> {
        (self.0)(task, inputs, log)
    }
}

pub fn from_fn<F>(f: F) -> FnComputation<F>
where
    F: Fn(&TaskInstance, Inputs, &TaskLog) -> Result<Value, BoxError> + Send + Sync,
{
    FnComputation(f)
}
