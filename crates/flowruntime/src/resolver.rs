use flowcore::{Edge, NodeSpec, Workflow, WorkflowError};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Dependency view over a validated workflow.
///
/// Node weights index `workflow.nodes`, edge weights index
/// `workflow.edges`, so every query can answer in declaration order.
pub struct WorkflowGraph<'a> {
    workflow: &'a Workflow,
    graph: DiGraph<usize, usize>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> WorkflowGraph<'a> {
    /// Validate the definition and build its dependency graph
    pub fn build(workflow: &'a Workflow) -> Result<Self, WorkflowError> {
        workflow.validate()?;

        let mut graph = DiGraph::with_capacity(workflow.nodes.len(), workflow.edges.len());
        let mut index = HashMap::with_capacity(workflow.nodes.len());

        for (position, node) in workflow.nodes.iter().enumerate() {
            let idx = graph.add_node(position);
            index.insert(node.id.as_str(), idx);
        }

        for (position, edge) in workflow.edges.iter().enumerate() {
            let from = *index
                .get(edge.source.as_str())
                .ok_or_else(|| WorkflowError::UnknownEdgeNode {
                    edge: position,
                    node_id: edge.source.clone(),
                })?;
            let to = *index
                .get(edge.target.as_str())
                .ok_or_else(|| WorkflowError::UnknownEdgeNode {
                    edge: position,
                    node_id: edge.target.clone(),
                })?;
            graph.add_edge(from, to, position);
        }

        Ok(Self {
            workflow,
            graph,
            index,
        })
    }

    pub fn workflow(&self) -> &'a Workflow {
        self.workflow
    }

    pub fn node(&self, node_id: &str) -> Option<&'a NodeSpec> {
        let idx = self.index.get(node_id)?;
        self.workflow.nodes.get(self.graph[*idx])
    }

    /// Nodes no edge points to, in declaration order
    pub fn start_nodes(&self) -> Vec<&'a NodeSpec> {
        self.nodes_without(Direction::Incoming)
    }

    /// Nodes no edge leaves from, in declaration order
    pub fn end_nodes(&self) -> Vec<&'a NodeSpec> {
        self.nodes_without(Direction::Outgoing)
    }

    pub fn is_start_node(&self, node_id: &str) -> bool {
        self.index.get(node_id).is_some_and(|idx| {
            self.graph
                .edges_directed(*idx, Direction::Incoming)
                .next()
                .is_none()
        })
    }

    /// Edges targeting `node_id`, in declaration order
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&'a Edge> {
        self.edges(node_id, Direction::Incoming)
    }

    /// Edges leaving `node_id`, in declaration order
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&'a Edge> {
        self.edges(node_id, Direction::Outgoing)
    }

    /// A node is ready once every source of its incoming edges has executed.
    pub fn is_ready(&self, executed: &HashSet<&str>, node_id: &str) -> bool {
        self.incoming_edges(node_id)
            .iter()
            .all(|edge| executed.contains(edge.source.as_str()))
    }

    /// True when some dependency chain loops back on itself
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<&'a NodeSpec> {
        // Node indices follow insertion order, which is declaration order.
        self.graph
            .node_indices()
            .filter(|idx| self.graph.edges_directed(*idx, direction).next().is_none())
            .filter_map(|idx| self.workflow.nodes.get(self.graph[idx]))
            .collect()
    }

    fn edges(&self, node_id: &str, direction: Direction) -> Vec<&'a Edge> {
        let Some(idx) = self.index.get(node_id) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|edge| *edge.weight())
            .collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .filter_map(|position| self.workflow.edges.get(position))
            .collect()
    }
}
