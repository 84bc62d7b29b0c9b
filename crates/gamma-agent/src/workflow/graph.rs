use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use gamma_core::error::{GammaError, Result};

use super::node::{NodeStatus, StepSpec, TaskNode};

/// A reusable workflow template: a DAG of named steps.
///
/// Templates are immutable once built. Each execution clones the graph so
/// node statuses never leak between runs. Declaration order of steps is
/// preserved and used as the deterministic tie-break among ready nodes.
#[derive(Clone)]
pub struct WorkflowGraph {
    name: String,
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
}

impl WorkflowGraph {
    /// Build and validate a graph. Duplicate ids, dependencies on unknown
    /// steps, and cycles are all rejected before anything is stored — no
    /// partial registration.
    pub fn build(name: &str, steps: Vec<StepSpec>) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(GammaError::DuplicateStep {
                    workflow: name.to_string(),
                    step: step.id.clone(),
                });
            }
        }

        for step in &steps {
            for dep in &step.depends_on {
                if !index.contains_key(dep) {
                    return Err(GammaError::UnknownDependency {
                        workflow: name.to_string(),
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut dag = DiGraph::<(), ()>::new();
        let mut petgraph_index = HashMap::new();
        for step in &steps {
            petgraph_index.insert(step.id.as_str(), dag.add_node(()));
        }
        for step in &steps {
            for dep in &step.depends_on {
                dag.add_edge(petgraph_index[dep.as_str()], petgraph_index[step.id.as_str()], ());
            }
        }
        if is_cyclic_directed(&dag) {
            return Err(GammaError::CyclicWorkflow(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            nodes: steps.into_iter().map(TaskNode::from_spec).collect(),
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &TaskNode {
        &self.nodes[idx]
    }

    pub fn status_of(&self, id: &str) -> Option<NodeStatus> {
        self.index.get(id).map(|&i| self.nodes[i].status)
    }

    pub(crate) fn set_status(&mut self, idx: usize, status: NodeStatus) {
        self.nodes[idx].status = status;
    }

    /// Indices of ready nodes: pending, with every dependency completed.
    /// Returned in declaration order.
    pub fn ready_nodes(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.status == NodeStatus::Pending
                    && node.depends_on.iter().all(|dep| {
                        self.index
                            .get(dep)
                            .map(|&i| self.nodes[i].status == NodeStatus::Completed)
                            .unwrap_or(false)
                    })
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn all_completed(&self) -> bool {
        self.nodes
            .iter()
            .all(|node| node.status == NodeStatus::Completed)
    }
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::node::{FnStep, JsonMap};
    use super::*;

    fn noop(id: &str) -> StepSpec {
        StepSpec::new(id, FnStep(|_: &JsonMap| Ok(JsonMap::new())))
    }

    #[test]
    fn test_acyclic_graph_accepted() {
        let graph = WorkflowGraph::build(
            "pipeline",
            vec![
                noop("a"),
                noop("b").depends_on(&["a"]),
                noop("c").depends_on(&["a", "b"]),
            ],
        )
        .unwrap();
        assert_eq!(graph.nodes().len(), 3);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = WorkflowGraph::build(
            "looped",
            vec![noop("a").depends_on(&["b"]), noop("b").depends_on(&["a"])],
        )
        .unwrap_err();
        assert!(matches!(err, GammaError::CyclicWorkflow(_)));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err =
            WorkflowGraph::build("selfloop", vec![noop("a").depends_on(&["a"])]).unwrap_err();
        assert!(matches!(err, GammaError::CyclicWorkflow(_)));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err =
            WorkflowGraph::build("dangling", vec![noop("a").depends_on(&["ghost"])]).unwrap_err();
        assert!(matches!(err, GammaError::UnknownDependency { .. }));
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let err = WorkflowGraph::build("dupes", vec![noop("a"), noop("a")]).unwrap_err();
        assert!(matches!(err, GammaError::DuplicateStep { .. }));
    }

    #[test]
    fn test_ready_nodes_follow_declaration_order() {
        let mut graph = WorkflowGraph::build(
            "diamond",
            vec![
                noop("left"),
                noop("right"),
                noop("join").depends_on(&["left", "right"]),
            ],
        )
        .unwrap();

        assert_eq!(graph.ready_nodes(), vec![0, 1]);

        graph.set_status(0, NodeStatus::Completed);
        assert_eq!(graph.ready_nodes(), vec![1]);

        graph.set_status(1, NodeStatus::Completed);
        assert_eq!(graph.ready_nodes(), vec![2]);
    }

    #[test]
    fn test_clone_isolates_statuses() {
        let template = WorkflowGraph::build("iso", vec![noop("a")]).unwrap();
        let mut run = template.clone();
        run.set_status(0, NodeStatus::Completed);
        assert_eq!(template.status_of("a"), Some(NodeStatus::Pending));
        assert_eq!(run.status_of("a"), Some(NodeStatus::Completed));
    }
}
