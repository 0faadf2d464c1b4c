mod dependency;
mod execution;
mod executor;
pub mod graph;
mod options;
mod pipeline;
mod task_state;
mod task_wrapper;

pub use graph::{EdgesData, NodesData, PipelineGraph};
pub use options::BuildOptions;
pub use pipeline::{BuildReport, Pipeline};
pub use task_state::TaskState;
