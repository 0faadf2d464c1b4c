use std::sync::Arc;

use crate::config::{ParamConfig, PipelineConfig};
use crate::error::{ParamError, StoreError, TargetError};
use crate::storage::{create_cloud_store, LocalStore, ObjectStore};
use crate::target::{Target, TargetFactory, TargetKind};
use crate::task::{Binding, Kwargs, TaskDefinition, TaskInstance};

/// What running tasks needs from the outside: configuration, externally
/// configured parameter values and the stores targets write to.
#[derive(Clone)]
pub struct PipelineContext {
    config: PipelineConfig,
    params: Arc<ParamConfig>,
    targets: TargetFactory,
}

impl PipelineContext {
    /// Local targets under `config.target_dir`; cloud targets in the configured
    /// bucket, if any.
    pub fn new(config: PipelineConfig) -> Result<Self, StoreError> {
        let local: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(config.target_dir.clone()));
        let cloud = create_cloud_store(&config.cloud)?;
        Ok(Self::with_stores(config, local, cloud))
    }

    pub fn with_stores(
        config: PipelineConfig,
        local: Arc<dyn ObjectStore>,
        cloud: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            config,
            params: Arc::new(ParamConfig::default()),
            targets: TargetFactory::new(local, cloud),
        }
    }

    pub fn with_params(mut self, params: ParamConfig) -> Self {
        self.params = Arc::new(params);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn params(&self) -> &Arc<ParamConfig> {
        &self.params
    }

    /// Instantiate `definition` with keyword arguments, resolving the rest from
    /// the parameter configuration. Unknown keywords are rejected.
    pub fn instantiate(
        &self,
        definition: &Arc<TaskDefinition>,
        kwargs: Kwargs,
    ) -> Result<TaskInstance, ParamError> {
        TaskInstance::bind(definition, self.params.clone(), &[], &kwargs, Binding::Strict)
    }

    pub fn target_kind(&self, definition: &TaskDefinition) -> TargetKind {
        definition.target().unwrap_or(self.config.default_target)
    }

    pub fn target_for(&self, task: &TaskInstance) -> Result<Arc<dyn Target>, TargetError> {
        let kind = self.target_kind(task.definition());
        self.targets.create(kind, task.family(), task.task_id())
    }
}
