//! Standard node library
//!
//! Built-in handlers for the workflow engine and the sandboxed expression
//! language used by `transform` and `condition`.

pub mod expr;
mod http;
mod log;
mod transform;
mod trigger;

pub use http::{HttpRequestNode, DEFAULT_HTTP_TIMEOUT};
pub use log::LogNode;
pub use transform::{ConditionNode, TransformNode};
pub use trigger::TriggerNode;

use flowruntime::NodeRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Settings for the built-in handlers
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub http_timeout: Duration,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    register_all_with(registry, NodeOptions::default());
}

pub fn register_all_with(registry: &mut NodeRegistry, options: NodeOptions) {
    registry.register(Arc::new(TriggerNode));
    registry.register(Arc::new(
        HttpRequestNode::new().with_timeout(options.http_timeout),
    ));
    registry.register(Arc::new(TransformNode));
    registry.register(Arc::new(ConditionNode));
    registry.register(Arc::new(LogNode));
}
