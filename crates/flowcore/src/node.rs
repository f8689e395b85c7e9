use crate::{events::EventEmitter, ExecutionId, NodeError, NodeId, Outputs, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Behavior bound to one or more node type tags.
///
/// A single instance serves every run concurrently, so implementations must
/// not keep per-call mutable state.
#[async_trait]
pub trait Node: Send + Sync {
    /// Primary type tag (e.g., "http_request", "transform")
    fn node_type(&self) -> &str;

    /// Additional tags resolving to the same behavior
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Execute the node with given context
    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError>;

    /// Description shown by node listings
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct NodeContext {
    pub execution_id: ExecutionId,

    pub node_id: NodeId,

    pub node_type: String,

    /// Input values resolved from upstream outputs and run parameters
    pub inputs: Outputs,

    /// Declared input defaults from the node definition
    pub config: Outputs,

    /// Writes to the run's execution log
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(
        execution_id: impl Into<ExecutionId>,
        node_id: impl Into<NodeId>,
        node_type: impl Into<String>,
        events: EventEmitter,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            node_type: node_type.into(),
            inputs: Outputs::new(),
            config: Outputs::new(),
            events,
        }
    }

    pub fn with_inputs(mut self, inputs: Outputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_config(mut self, config: Outputs) -> Self {
        self.config = config;
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Resolved input, falling back to the declared default
    pub fn input_or_config(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name).or_else(|| self.config.get(name))
    }
}

/// Output from node execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Output port values
    pub outputs: Outputs,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }
}

impl From<Outputs> for NodeOutput {
    fn from(outputs: Outputs) -> Self {
        Self { outputs }
    }
}

/// Metadata about a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PortDefinition {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}
