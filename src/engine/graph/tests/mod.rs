#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::PipelineConfig;
    use crate::context::PipelineContext;
    use crate::engine::dependency::DependencyGraph;
    use crate::storage::MemoryStore;
    use crate::task::{Kwargs, RetryPolicy, TaskDefinition, TaskInstance};
    use std::sync::Arc;

    fn context() -> PipelineContext {
        PipelineContext::with_stores(PipelineConfig::default(), Arc::new(MemoryStore::new()), None)
    }

    #[test]
    fn test_task_name_strips_namespace() {
        assert_eq!(task_name("etl.sales.Extract"), "Extract");
        assert_eq!(task_name("Extract"), "Extract");
    }

    #[tokio::test]
    async fn test_layers_follow_longest_path() {
        // Top -> Left -> Base, and Top -> Base directly
        let base = TaskDefinition::builder("demo.Base").build();
        let left = TaskDefinition::builder("demo.Left")
            .requires_list([&base])
            .build();
        let top = TaskDefinition::builder("demo.Top")
            .requires_list([&left, &base])
            .build();
        let root = TaskInstance::new(&top, Kwargs::new()).expect("no params");

        let ctx = context();
        let graph = DependencyGraph::expand(&[root], &ctx, RetryPolicy::default(), false)
            .await
            .expect("expand");
        let data = PipelineGraph::from_dependency_graph(&graph);

        assert_eq!(data.nodes.len(), 3);
        let y_of = |name: &str| {
            let idx = data
                .nodes
                .task_name
                .iter()
                .position(|n| n == name)
                .expect("node");
            data.nodes.y[idx]
        };
        assert_eq!(y_of("Top"), 0.0);
        assert_eq!(y_of("Left"), 1.0);
        assert_eq!(y_of("Base"), 2.0);
        assert!(data.nodes.x.iter().all(|x| *x == 0.0));
        assert!(data.nodes.complete.iter().all(|c| !c));
        assert_eq!(data.nodes.task_family[0], "demo.Top");

        // Top->Left, Top->Base, Left->Base
        assert_eq!(data.edges.len(), 3);
        assert!(data.edges.y0.iter().zip(&data.edges.y1).all(|(a, b)| a < b));
    }

    #[tokio::test]
    async fn test_siblings_share_a_layer() {
        let a = TaskDefinition::builder("A").build();
        let b = TaskDefinition::builder("B").build();
        let top = TaskDefinition::builder("Top").requires_list([&a, &b]).build();
        let root = TaskInstance::new(&top, Kwargs::new()).expect("no params");

        let ctx = context();
        let graph = DependencyGraph::expand(&[root], &ctx, RetryPolicy::default(), false)
            .await
            .expect("expand");
        let data = PipelineGraph::from_dependency_graph(&graph);

        assert_eq!(data.nodes.task_name, vec!["Top", "A", "B"]);
        assert_eq!(data.nodes.x, vec![0.0, 0.0, 1.0]);
        assert_eq!(data.nodes.y, vec![0.0, 1.0, 1.0]);
        assert_eq!(data.nodes.index_of(graph.order[2].as_str()), Some(2));
    }
}
