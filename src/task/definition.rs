use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::inherit::inherited_params;
use super::param::{Kwargs, Parameter};
use super::retry::policy::RetryPolicy;
use super::{Computation, NoopComputation};
use crate::target::TargetKind;

/// Names every task already answers to. A parameter with one of these names is
/// never inherited.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "clone",
    "complete",
    "input",
    "load",
    "load_log",
    "output",
    "params",
    "remove",
    "requires",
    "run",
    "task_family",
    "task_id",
];

/// Reference to an upstream task, with parameters pinned for that edge.
#[derive(Clone)]
pub struct Dependency {
    task: Arc<TaskDefinition>,
    fixed: Kwargs,
}

impl Dependency {
    pub fn new(task: &Arc<TaskDefinition>) -> Self {
        Self {
            task: task.clone(),
            fixed: Kwargs::new(),
        }
    }

    /// `fixed` overrides the downstream values when the upstream is cloned and
    /// is excluded from inheritance.
    pub fn with_fixed(task: &Arc<TaskDefinition>, fixed: Kwargs) -> Self {
        Self {
            task: task.clone(),
            fixed,
        }
    }

    pub fn task(&self) -> &Arc<TaskDefinition> {
        &self.task
    }

    pub fn fixed(&self) -> &Kwargs {
        &self.fixed
    }
}

impl From<&Arc<TaskDefinition>> for Dependency {
    fn from(task: &Arc<TaskDefinition>) -> Self {
        Dependency::new(task)
    }
}

impl From<Arc<TaskDefinition>> for Dependency {
    fn from(task: Arc<TaskDefinition>) -> Self {
        Self {
            task,
            fixed: Kwargs::new(),
        }
    }
}

impl From<(&Arc<TaskDefinition>, Kwargs)> for Dependency {
    fn from((task, fixed): (&Arc<TaskDefinition>, Kwargs)) -> Self {
        Dependency::with_fixed(task, fixed)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("task", &self.task.family())
            .field("fixed", &self.fixed)
            .finish()
    }
}

/// Declared upstream tasks, either ordered or keyed by a logical name.
#[derive(Clone, Debug, Default)]
pub enum Requires {
    #[default]
    None,
    List(Vec<Dependency>),
    /// Keys keep their declaration order.
    Map(Vec<(String, Dependency)>),
}

impl Requires {
    pub fn list<I, D>(deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        Requires::List(deps.into_iter().map(Into::into).collect())
    }

    /// A repeated key replaces the earlier dependency but keeps its position.
    pub fn map<I, K, D>(deps: I) -> Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Dependency>,
    {
        let mut entries: Vec<(String, Dependency)> = Vec::new();
        for (key, dep) in deps {
            let key = key.into();
            let dep = dep.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = dep,
                None => entries.push((key, dep)),
            }
        }
        Requires::Map(entries)
    }

    pub fn dependencies(&self) -> Box<dyn Iterator<Item = &Dependency> + '_> {
        match self {
            Requires::None => Box::new(std::iter::empty()),
            Requires::List(deps) => Box::new(deps.iter()),
            Requires::Map(deps) => Box::new(deps.iter().map(|(_, d)| d)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Requires::None => true,
            Requires::List(deps) => deps.is_empty(),
            Requires::Map(deps) => deps.is_empty(),
        }
    }
}

/// Immutable description of a kind of task: its parameter schema, upstream
/// dependencies, output target and computation.
#[derive(Clone)]
pub struct TaskDefinition {
    family: String,
    params: Vec<(String, Parameter)>,
    attributes: BTreeSet<String>,
    requires: Requires,
    target: Option<TargetKind>,
    persist_stdout: bool,
    retry_policy: Option<RetryPolicy>,
    computation: Arc<dyn Computation>,
}

impl TaskDefinition {
    pub fn builder(family: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(family)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Parameters in declaration order, own parameters first.
    pub fn params(&self) -> &[(String, Parameter)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Whether `name` is already taken on this task, by a parameter, a plain
    /// attribute or a reserved name.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.param(name).is_some()
            || self.attributes.contains(name)
            || RESERVED_ATTRIBUTES.contains(&name)
    }

    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    pub fn requires(&self) -> &Requires {
        &self.requires
    }

    /// `None` means the configured default target.
    pub fn target(&self) -> Option<TargetKind> {
        self.target
    }

    pub fn persist_stdout(&self) -> bool {
        self.persist_stdout
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry_policy
    }

    pub fn computation(&self) -> &Arc<dyn Computation> {
        &self.computation
    }

    pub(crate) fn with_requires(&self, requires: Requires, inherit: bool) -> TaskDefinition {
        let mut definition = self.clone();
        definition.requires = requires;
        if inherit {
            let inherited = inherited_params(&definition, &definition.requires);
            definition.params.extend(inherited);
        }
        definition
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("family", &self.family)
            .field("params", &self.params)
            .field("attributes", &self.attributes)
            .field("requires", &self.requires)
            .field("target", &self.target)
            .field("persist_stdout", &self.persist_stdout)
            .finish_non_exhaustive()
    }
}

pub struct TaskBuilder {
    family: String,
    params: Vec<(String, Parameter)>,
    attributes: BTreeSet<String>,
    requires: Requires,
    inherit: bool,
    target: Option<TargetKind>,
    persist_stdout: bool,
    retry_policy: Option<RetryPolicy>,
    computation: Arc<dyn Computation>,
}

impl TaskBuilder {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            params: Vec::new(),
            attributes: BTreeSet::new(),
            requires: Requires::None,
            inherit: false,
            target: None,
            persist_stdout: false,
            retry_policy: None,
            computation: Arc::new(NoopComputation),
        }
    }

    /// Declare a parameter. Redeclaring a name replaces it in place.
    pub fn param(mut self, name: impl Into<String>, param: Parameter) -> Self {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = param,
            None => self.params.push((name, param)),
        }
        self
    }

    /// Declare a non-parameter attribute. It blocks inheritance of a same-named
    /// upstream parameter.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    /// Depend on `deps` in order, without inheriting their parameters.
    pub fn requires_list<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        self.requires = Requires::list(deps);
        self.inherit = false;
        self
    }

    /// Depend on named `deps`, without inheriting their parameters.
    pub fn requires_dict<I, K, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Dependency>,
    {
        self.requires = Requires::map(deps);
        self.inherit = false;
        self
    }

    /// Depend on `deps` in order and take over every upstream parameter this
    /// task doesn't define and the edge doesn't pin.
    pub fn inherit_list<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        self.requires = Requires::list(deps);
        self.inherit = true;
        self
    }

    /// Keyed variant of [`TaskBuilder::inherit_list`].
    pub fn inherit_dict<I, K, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Dependency>,
    {
        self.requires = Requires::map(deps);
        self.inherit = true;
        self
    }

    pub fn target(mut self, kind: TargetKind) -> Self {
        self.target = Some(kind);
        self
    }

    pub fn persist_stdout(mut self, enabled: bool) -> Self {
        self.persist_stdout = enabled;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn computation<C: Computation + 'static>(mut self, computation: C) -> Self {
        self.computation = Arc::new(computation);
        self
    }

    pub fn build(self) -> Arc<TaskDefinition> {
        let definition = TaskDefinition {
            family: self.family,
            params: self.params,
            attributes: self.attributes,
            requires: Requires::None,
            target: self.target,
            persist_stdout: self.persist_stdout,
            retry_policy: self.retry_policy,
            computation: self.computation,
        };
        Arc::new(definition.with_requires(self.requires, self.inherit))
    }
}
