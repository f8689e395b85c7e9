use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Node {node_id} failed: {source}")]
    NodeFailed {
        node_id: NodeId,
        #[source]
        source: NodeError,
    },

    #[error("Node {node_id} has a dependency that can never be satisfied (deferred {deferrals} times without progress)")]
    UnsatisfiableDependency { node_id: NodeId, deferrals: usize },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure raised by a node handler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Cancelled")]
    Cancelled,
}

/// Problems with a workflow definition, detected before a run starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Node id must not be empty (node at position {0})")]
    EmptyNodeId(usize),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Edge {edge} references unknown node: {node_id}")]
    UnknownEdgeNode { edge: usize, node_id: NodeId },
}

/// Returned by a status reporter that could not persist a checkpoint
#[derive(Error, Debug)]
#[error("Status reporter failed: {message}")]
pub struct ReporterError {
    pub message: String,
}

impl ReporterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
