//! Core abstractions for the flow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: workflow definitions, the per-run execution
//! context, the node trait and the status reporter interface.

mod context;
mod error;
pub mod events;
mod node;
mod reporter;
mod value;
mod workflow;

pub use context::{
    ExecutionContext, ExecutionId, NodeExecutionState, NodeStatus, RunFailure, RunStatus,
};
pub use error::{FlowError, NodeError, ReporterError, WorkflowError};
pub use events::*;
pub use node::{Node, NodeContext, NodeMetadata, NodeOutput, PortDefinition};
pub use reporter::{FanoutReporter, NoopReporter, StatusReporter};
pub use value::{Outputs, Value};
pub use workflow::{Edge, NodeId, NodeSpec, Workflow, WorkflowId};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
