use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use super::dependency::DependencyGraph;

/// Node columns of a pipeline graph, one entry per task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodesData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub task_id: Vec<String>,
    pub task_name: Vec<String>,
    pub task_family: Vec<String>,
    pub complete: Vec<bool>,
}

impl NodesData {
    pub fn len(&self) -> usize {
        self.task_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_id.is_empty()
    }

    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.task_id.iter().position(|id| id == task_id)
    }
}

/// Edge columns, from a task `(x0, y0)` to one of its requirements `(x1, y1)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgesData {
    pub x0: Vec<f64>,
    pub y0: Vec<f64>,
    pub x1: Vec<f64>,
    pub y1: Vec<f64>,
}

impl EdgesData {
    pub fn len(&self) -> usize {
        self.x0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x0.is_empty()
    }
}

/// Column-oriented node and edge data of a pipeline, ready for plotting.
///
/// Roots sit on layer `y = 0`; every requirement sits at least one layer
/// below each task requiring it. `x` is the position inside the layer, in
/// discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineGraph {
    pub nodes: NodesData,
    pub edges: EdgesData,
}

/// Family name without its namespace.
pub(crate) fn task_name(family: &str) -> &str {
    family.rsplit('.').next().unwrap_or(family)
}

impl PipelineGraph {
    pub(crate) fn from_dependency_graph(graph: &DependencyGraph) -> Self {
        let depth = longest_path_depths(graph);

        let mut layer_fill: HashMap<usize, usize> = HashMap::new();
        let mut position: HashMap<&str, (f64, f64)> = HashMap::new();
        let mut nodes = NodesData::default();

        for id in &graph.order {
            let Some(wrapper) = graph.tasks.get(id) else {
                continue;
            };
            let y = depth.get(id.as_str()).copied().unwrap_or(0);
            let slot = layer_fill.entry(y).or_insert(0);
            let x = *slot;
            *slot += 1;

            position.insert(id, (x as f64, y as f64));
            nodes.x.push(x as f64);
            nodes.y.push(y as f64);
            nodes.task_id.push(id.clone());
            nodes.task_name.push(task_name(wrapper.task.family()).to_string());
            nodes.task_family.push(wrapper.task.family().to_string());
            nodes.complete.push(wrapper.complete);
        }

        let mut edges = EdgesData::default();
        for id in &graph.order {
            let (Some(wrapper), Some(&(x0, y0))) = (graph.tasks.get(id), position.get(id.as_str()))
            else {
                continue;
            };
            for dep in &wrapper.dependencies {
                if let Some(&(x1, y1)) = position.get(dep.as_str()) {
                    edges.x0.push(x0);
                    edges.y0.push(y0);
                    edges.x1.push(x1);
                    edges.y1.push(y1);
                }
            }
        }

        Self { nodes, edges }
    }
}

// Walks from the roots downwards, releasing a task once every task requiring
// it has been placed.
fn longest_path_depths(graph: &DependencyGraph) -> HashMap<&str, usize> {
    let mut pending: HashMap<&str, usize> = graph
        .order
        .iter()
        .map(|id| {
            let requiring = graph.dependents.get(id).map(Vec::len).unwrap_or(0);
            (id.as_str(), requiring)
        })
        .collect();

    let mut depth: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&str> = graph
        .order
        .iter()
        .map(String::as_str)
        .filter(|id| pending.get(id).copied() == Some(0))
        .collect();
    for id in &queue {
        depth.insert(id, 0);
    }

    while let Some(id) = queue.pop_front() {
        let current = depth.get(id).copied().unwrap_or(0);
        let Some(wrapper) = graph.tasks.get(id) else {
            continue;
        };
        for dep in &wrapper.dependencies {
            let entry = depth.entry(dep.as_str()).or_insert(0);
            *entry = (*entry).max(current + 1);
            if let Some(count) = pending.get_mut(dep.as_str()) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    queue.push_back(dep.as_str());
                }
            }
        }
    }

    depth
}

mod tests;
