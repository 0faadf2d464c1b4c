use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use super::definition::{Dependency, Requires, TaskDefinition};
use super::identity::{param_to_string, task_id_str};
use super::param::{get_param_values, Binding, Kwargs};
use super::run::Requirements;
use crate::config::ParamConfig;
use crate::context::PipelineContext;
use crate::error::{ParamError, TargetError};
use crate::target::Target;

/// A task definition bound to concrete parameter values.
///
/// Cheap to clone. Two instances are equal when their task ids are, i.e. same
/// family and same significant parameter values.
#[derive(Clone)]
pub struct TaskInstance {
    definition: Arc<TaskDefinition>,
    params: Arc<[(String, Value)]>,
    config: Arc<ParamConfig>,
    task_id: Arc<str>,
}

impl TaskInstance {
    /// Bind keyword arguments strictly, with no external configuration.
    pub fn new(definition: &Arc<TaskDefinition>, kwargs: Kwargs) -> Result<Self, ParamError> {
        Self::bind(
            definition,
            Arc::new(ParamConfig::default()),
            &[],
            &kwargs,
            Binding::Strict,
        )
    }

    pub fn bind(
        definition: &Arc<TaskDefinition>,
        config: Arc<ParamConfig>,
        args: &[Value],
        kwargs: &Kwargs,
        binding: Binding,
    ) -> Result<Self, ParamError> {
        let params = get_param_values(
            definition.family(),
            definition.params(),
            args,
            kwargs,
            &config,
            binding,
        )?;
        let task_id = task_id_str(
            definition.family(),
            params
                .iter()
                .filter(|(name, _)| {
                    definition
                        .param(name)
                        .map(|p| p.significant)
                        .unwrap_or(false)
                })
                .map(|(name, value)| (name.as_str(), value)),
        );
        Ok(Self {
            definition: definition.clone(),
            params: params.into(),
            config,
            task_id: task_id.into(),
        })
    }

    pub fn definition(&self) -> &Arc<TaskDefinition> {
        &self.definition
    }

    pub fn family(&self) -> &str {
        self.definition.family()
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// All bound values, in declaration order.
    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Parameter values rendered as strings, optionally significant ones only.
    pub fn to_str_params(&self, only_significant: bool) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter(|(name, _)| {
                !only_significant
                    || self
                        .definition
                        .param(name)
                        .map(|p| p.significant)
                        .unwrap_or(false)
            })
            .map(|(name, value)| (name.clone(), param_to_string(value)))
            .collect()
    }

    pub fn params_as_kwargs(&self) -> Kwargs {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Instantiate `definition` with this task's values, `overrides` on top.
    /// Values `definition` doesn't declare are dropped.
    pub fn clone_as(
        &self,
        definition: &Arc<TaskDefinition>,
        overrides: &Kwargs,
    ) -> Result<TaskInstance, ParamError> {
        let mut kwargs = self.params_as_kwargs();
        for (name, value) in overrides {
            kwargs.insert(name.clone(), value.clone());
        }
        TaskInstance::bind(
            definition,
            self.config.clone(),
            &[],
            &kwargs,
            Binding::Relaxed,
        )
    }

    fn clone_dependency(&self, dependency: &Dependency) -> Result<TaskInstance, ParamError> {
        self.clone_as(dependency.task(), dependency.fixed())
    }

    /// Upstream instances this task needs, in declaration order.
    pub fn requires(&self) -> Result<Requirements, ParamError> {
        match self.definition.requires() {
            Requires::List(deps) if !deps.is_empty() => deps
                .iter()
                .map(|dep| self.clone_dependency(dep))
                .collect::<Result<Vec<_>, _>>()
                .map(Requirements::List),
            Requires::Map(deps) if !deps.is_empty() => deps
                .iter()
                .map(|(key, dep)| Ok((key.clone(), self.clone_dependency(dep)?)))
                .collect::<Result<Vec<_>, ParamError>>()
                .map(Requirements::Map),
            _ => Ok(Requirements::List(Vec::new())),
        }
    }

    pub fn output(&self, ctx: &PipelineContext) -> Result<Arc<dyn Target>, TargetError> {
        ctx.target_for(self)
    }

    pub async fn complete(&self, ctx: &PipelineContext) -> Result<bool, TargetError> {
        self.output(ctx)?.exists().await
    }

    pub async fn load(&self, ctx: &PipelineContext) -> Result<Value, TargetError> {
        self.output(ctx)?.load().await
    }

    pub async fn remove(&self, ctx: &PipelineContext) -> Result<(), TargetError> {
        self.output(ctx)?.remove().await
    }

    pub async fn load_log(&self, ctx: &PipelineContext) -> Result<Option<String>, TargetError> {
        self.output(ctx)?.load_log().await
    }
}

impl PartialEq for TaskInstance {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id
    }
}

impl Eq for TaskInstance {}

impl Hash for TaskInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.task_id.hash(state);
    }
}

impl fmt::Debug for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInstance")
            .field("task_id", &self.task_id)
            .field("params", &self.params)
            .finish()
    }
}

impl fmt::Display for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .to_str_params(false)
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.family(), params)
    }
}
