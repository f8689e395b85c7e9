//! Workflow execution runtime
//!
//! This crate provides the execution engine that runs workflows: the
//! dependency resolver, the node registry, the FIFO scheduler and the
//! runtime facade for inline and background runs.

mod executor;
mod registry;
mod resolver;
mod runtime;

pub use executor::{ExecutionResult, WorkflowExecutor};
pub use registry::{NodeRegistry, PassthroughNode};
pub use resolver::WorkflowGraph;
pub use runtime::{ExecutionHandle, FlowRuntime, RuntimeConfig};
