//! Dependency inheritance: declaring upstream tasks and taking over their
//! parameters so one invocation can parameterize a whole chain.

use std::sync::Arc;

use super::definition::{Dependency, Requires, TaskDefinition};
use super::param::Parameter;

/// Parameters `task` gains from `requires`.
///
/// An upstream parameter is skipped when the edge pins it, when `task` already
/// has an attribute of that name, or when an earlier upstream provided it.
pub(crate) fn inherited_params(task: &TaskDefinition, requires: &Requires) -> Vec<(String, Parameter)> {
    let mut inherited: Vec<(String, Parameter)> = Vec::new();
    for dependency in requires.dependencies() {
        for (name, param) in dependency.task().params() {
            if dependency.fixed().contains_key(name)
                || task.has_attribute(name)
                || inherited.iter().any(|(n, _)| n == name)
            {
                continue;
            }
            inherited.push((name.clone(), param.clone()));
        }
    }
    inherited
}

/// Copy of `task` depending on `deps` in order, with their parameters merged in.
/// Replaces any dependency declaration `task` had.
pub fn inherit_list<I, D>(task: &TaskDefinition, deps: I) -> Arc<TaskDefinition>
where
    I: IntoIterator<Item = D>,
    D: Into<Dependency>,
{
    Arc::new(task.with_requires(Requires::list(deps), true))
}

/// Copy of `task` depending on named `deps`, with their parameters merged in.
pub fn inherit_dict<I, K, D>(task: &TaskDefinition, deps: I) -> Arc<TaskDefinition>
where
    I: IntoIterator<Item = (K, D)>,
    K: Into<String>,
    D: Into<Dependency>,
{
    Arc::new(task.with_requires(Requires::map(deps), true))
}
